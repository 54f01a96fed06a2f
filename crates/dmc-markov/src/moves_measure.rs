use dmc_core::{DmcError, RandomSource};
use dmc_diagram::MeasureLine;

use crate::dispatch::MoveKind;
use crate::proposal::{GLineUpdate, MoveContext, Patch, Proposal, WLineUpdate};

pub(crate) fn change_measure_g_to_w<R: RandomSource + ?Sized>(
    ctx: &mut MoveContext<'_, R>,
) -> Result<Option<Proposal>, DmcError> {
    let MeasureLine::G(g) = ctx.diagram.measure() else {
        return Ok(None);
    };
    let Some(w) = ctx.diagram.random_wline(ctx.rng) else {
        return Ok(None);
    };
    let w_line = ctx.diagram.wline(w)?;
    if w_line.is_delta {
        return Ok(None);
    }
    let g_line = ctx.diagram.gline(g)?;

    let g_weight = ctx.diagram.evaluate_gline(ctx.oracle, g, &[], false)?;
    let mut flags = ctx.diagram.wline_flags(w)?;
    flags.is_measure = true;
    let w_weight = ctx.diagram.evaluate_wline(ctx.oracle, w, &[], flags)?;
    let ratio = (g_weight * w_weight) / (g_line.weight * w_line.weight);
    let counts = ctx.diagram.wlines().len() as f64 / ctx.diagram.glines().len() as f64;
    let bias = counts * ctx.selection_ratio(MoveKind::ChangeMeasureFromGToW);

    let patch = Patch {
        glines: vec![(
            g,
            GLineUpdate {
                weight: g_weight,
                is_measure: false,
                ..GLineUpdate::from(g_line)
            },
        )],
        wlines: vec![(
            w,
            WLineUpdate {
                weight: w_weight,
                is_measure: true,
                ..WLineUpdate::from(w_line)
            },
        )],
        measure: Some(MeasureLine::W(w)),
        ..Patch::default()
    };
    Ok(Some(Proposal { ratio, bias, patch }))
}

pub(crate) fn change_measure_w_to_g<R: RandomSource + ?Sized>(
    ctx: &mut MoveContext<'_, R>,
) -> Result<Option<Proposal>, DmcError> {
    let MeasureLine::W(w) = ctx.diagram.measure() else {
        return Ok(None);
    };
    let Some(g) = ctx.diagram.random_gline(ctx.rng) else {
        return Ok(None);
    };
    let w_line = ctx.diagram.wline(w)?;
    let g_line = ctx.diagram.gline(g)?;

    let g_weight = ctx.diagram.evaluate_gline(ctx.oracle, g, &[], true)?;
    let mut flags = ctx.diagram.wline_flags(w)?;
    flags.is_measure = false;
    let w_weight = ctx.diagram.evaluate_wline(ctx.oracle, w, &[], flags)?;
    let ratio = (g_weight * w_weight) / (g_line.weight * w_line.weight);
    let counts = ctx.diagram.glines().len() as f64 / ctx.diagram.wlines().len() as f64;
    let bias = counts * ctx.selection_ratio(MoveKind::ChangeMeasureFromWToG);

    let patch = Patch {
        glines: vec![(
            g,
            GLineUpdate {
                weight: g_weight,
                is_measure: true,
                ..GLineUpdate::from(g_line)
            },
        )],
        wlines: vec![(
            w,
            WLineUpdate {
                weight: w_weight,
                is_measure: false,
                ..WLineUpdate::from(w_line)
            },
        )],
        measure: Some(MeasureLine::G(g)),
        ..Patch::default()
    };
    Ok(Some(Proposal { ratio, bias, patch }))
}
