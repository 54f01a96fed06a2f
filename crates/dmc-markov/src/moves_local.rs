use dmc_core::{Dir, DmcError, RandomSource};
use dmc_diagram::{VertexId, VertexState, WLineId};

use crate::dispatch::MoveKind;
use crate::proposal::{MoveContext, Proposal, WormChange};
use crate::rules::{random_tau, tau_probability};

/// Builds the proposal for vertices moved in place, folding in the worm
/// weight when a worm end moved.
fn in_place<R: RandomSource + ?Sized>(
    ctx: &MoveContext<'_, R>,
    moved: Vec<(VertexId, VertexState)>,
    retag: Option<(WLineId, bool)>,
    bias: f64,
) -> Result<Proposal, DmcError> {
    let relocation = ctx.relocate(&moved, retag)?;
    let ratio = relocation.ratio;
    let worm = ctx.rescale_worm(&moved)?;
    let mut patch = relocation.into_patch(moved);
    let bias = match worm {
        Some((worm, worm_ratio)) => {
            patch.worm = WormChange::Set(worm);
            bias * worm_ratio
        }
        None => bias,
    };
    Ok(Proposal {
        ratio,
        bias,
        patch,
    })
}

pub(crate) fn change_tau<R: RandomSource + ?Sized>(
    ctx: &mut MoveContext<'_, R>,
) -> Result<Option<Proposal>, DmcError> {
    let Some(v) = ctx.diagram.random_vertex(ctx.rng) else {
        return Ok(None);
    };
    let tau = random_tau(ctx.rng, ctx.diagram.beta());

    let vertex = ctx.diagram.vertex(v)?;
    let mut moved = vec![(v, VertexState { tau, ..vertex.state() })];
    let line = ctx.diagram.wline(vertex.w)?;
    if line.is_delta {
        let partner = line.end(vertex.dir.flip());
        let state = ctx.diagram.vertex(partner)?.state();
        moved.push((partner, VertexState { tau, ..state }));
    }
    // uniform times: the proposal densities cancel
    in_place(ctx, moved, None, 1.0).map(Some)
}

pub(crate) fn change_r<R: RandomSource + ?Sized>(
    ctx: &mut MoveContext<'_, R>,
) -> Result<Option<Proposal>, DmcError> {
    let Some(v) = ctx.diagram.random_vertex(ctx.rng) else {
        return Ok(None);
    };
    let site = ctx.diagram.lattice().random_site(ctx.rng);
    let state = ctx.diagram.vertex(v)?.state();
    in_place(ctx, vec![(v, VertexState { site, ..state })], None, 1.0).map(Some)
}

/// Loop momenta are not resampled yet; the move is kept in the table so
/// selection probabilities stay comparable across configurations.
pub(crate) fn change_r_loop<R: RandomSource + ?Sized>(
    _ctx: &mut MoveContext<'_, R>,
) -> Result<Option<Proposal>, DmcError> {
    Ok(None)
}

pub(crate) fn change_delta_to_not_delta<R: RandomSource + ?Sized>(
    ctx: &mut MoveContext<'_, R>,
) -> Result<Option<Proposal>, DmcError> {
    let Some(w) = ctx.diagram.random_wline(ctx.rng) else {
        return Ok(None);
    };
    if !ctx.diagram.wline(w)?.is_delta {
        return Ok(None);
    }
    let beta = ctx.diagram.beta();
    let tau = random_tau(ctx.rng, beta);

    let out = ctx.diagram.wline(w)?.end(Dir::Out);
    let state = ctx.diagram.vertex(out)?.state();
    let bias = ctx.selection_ratio(MoveKind::ChangeDeltaToNotDelta) / tau_probability(beta);
    in_place(
        ctx,
        vec![(out, VertexState { tau, ..state })],
        Some((w, false)),
        bias,
    )
    .map(Some)
}

pub(crate) fn change_not_delta_to_delta<R: RandomSource + ?Sized>(
    ctx: &mut MoveContext<'_, R>,
) -> Result<Option<Proposal>, DmcError> {
    let Some(w) = ctx.diagram.random_wline(ctx.rng) else {
        return Ok(None);
    };
    let line = ctx.diagram.wline(w)?;
    if line.is_delta || line.is_measure {
        return Ok(None);
    }
    let tau = ctx.diagram.vertex(line.end(Dir::In))?.tau;
    let out = line.end(Dir::Out);
    let state = ctx.diagram.vertex(out)?.state();
    let bias = ctx.selection_ratio(MoveKind::ChangeNotDeltaToDelta)
        * tau_probability(ctx.diagram.beta());
    in_place(
        ctx,
        vec![(out, VertexState { tau, ..state })],
        Some((w, true)),
        bias,
    )
    .map(Some)
}
