//! Worm-sector updates: open and close the worm, slide its ends, and swap
//! the propagators leaving them.

use dmc_core::{Dir, DmcError, Momentum, RandomSource, MOMENTUM_SPACE};
use dmc_diagram::{VertexId, WFlags, WLineId, Worm, WormEnd};

use crate::dispatch::MoveKind;
use crate::proposal::{GLineUpdate, MoveContext, Patch, Proposal, WLineUpdate, WormChange};
use crate::rules::{random_dir, random_dspin, worm_blocked_at, worm_blocked_on_g};

/// Both worm ends would sit on vertices that cannot carry the spin current.
fn blocked_pair<R: RandomSource + ?Sized>(
    ctx: &MoveContext<'_, R>,
    ira: VertexId,
    masha: VertexId,
    dspin: i8,
) -> Result<bool, DmcError> {
    let ira = ctx.diagram.vertex(ira)?;
    let masha = ctx.diagram.vertex(masha)?;
    Ok(worm_blocked_at(dspin, ira.spin(Dir::In), ira.spin(Dir::Out))
        && worm_blocked_at(-dspin, masha.spin(Dir::In), masha.spin(Dir::Out)))
}

/// Factor shared by create and delete: reverse-over-forward proposal density
/// of opening a worm, times the worm-sector bias.
fn open_factor(n_wlines: usize, worm_weight: f64, worm_space_reweight: f64) -> f64 {
    n_wlines as f64 * 2.0 * 2.0 * MOMENTUM_SPACE as f64 * worm_weight * worm_space_reweight
}

pub(crate) fn create_worm<R: RandomSource + ?Sized>(
    ctx: &mut MoveContext<'_, R>,
) -> Result<Option<Proposal>, DmcError> {
    if ctx.diagram.worm().is_some() {
        return Ok(None);
    }
    let Some(w) = ctx.diagram.random_wline(ctx.rng) else {
        return Ok(None);
    };
    let end = random_dir(ctx.rng);
    let k = Momentum::random(ctx.rng);
    let dspin = random_dspin(ctx.rng);

    let line = ctx.diagram.wline(w)?;
    let ira = line.end(end);
    let masha = line.end(end.flip());
    if blocked_pair(ctx, ira, masha, dspin)? {
        return Ok(None);
    }

    let flags = WFlags {
        is_worm: true,
        ..ctx.diagram.wline_flags(w)?
    };
    let weight = ctx.diagram.evaluate_wline(ctx.oracle, w, &[], flags)?;
    let ratio = weight / line.weight;
    let worm_weight = ctx.worm_weight_at(ira, masha, &[])?;
    let bias = ctx.selection_ratio(MoveKind::CreateWorm)
        * open_factor(
            ctx.diagram.wlines().len(),
            worm_weight,
            ctx.bias.worm_space_reweight,
        );

    let patch = Patch {
        wlines: vec![(
            w,
            WLineUpdate {
                k: line.k - k * end.sign(),
                weight,
                is_worm: true,
                ..WLineUpdate::from(line)
            },
        )],
        worm: WormChange::Set(Worm {
            ira,
            masha,
            dspin,
            k,
            weight: worm_weight,
        }),
        ..Patch::default()
    };
    Ok(Some(Proposal { ratio, bias, patch }))
}

pub(crate) fn delete_worm<R: RandomSource + ?Sized>(
    ctx: &mut MoveContext<'_, R>,
) -> Result<Option<Proposal>, DmcError> {
    let Some(worm) = ctx.diagram.worm() else {
        return Ok(None);
    };
    let ira = ctx.diagram.vertex(worm.ira)?;
    let masha = ctx.diagram.vertex(worm.masha)?;
    if ira.w != masha.w || blocked_pair(ctx, worm.ira, worm.masha, worm.dspin)? {
        return Ok(None);
    }

    let w = ira.w;
    let line = ctx.diagram.wline(w)?;
    let flags = WFlags {
        is_worm: false,
        ..ctx.diagram.wline_flags(w)?
    };
    let weight = ctx.diagram.evaluate_wline(ctx.oracle, w, &[], flags)?;
    let ratio = weight / line.weight;
    let bias = ctx.selection_ratio(MoveKind::DeleteWorm)
        / open_factor(
            ctx.diagram.wlines().len(),
            worm.weight,
            ctx.bias.worm_space_reweight,
        );

    let patch = Patch {
        wlines: vec![(
            w,
            WLineUpdate {
                k: line.k + worm.k * ira.dir.sign(),
                weight,
                is_worm: false,
                ..WLineUpdate::from(line)
            },
        )],
        worm: WormChange::Remove,
        ..Patch::default()
    };
    Ok(Some(Proposal { ratio, bias, patch }))
}

pub(crate) fn move_worm_on_g<R: RandomSource + ?Sized>(
    ctx: &mut MoveContext<'_, R>,
) -> Result<Option<Proposal>, DmcError> {
    let Some(worm) = ctx.diagram.worm() else {
        return Ok(None);
    };
    let end = WormEnd::from_bit(ctx.rng.int_in(0, 1));
    let dir = random_dir(ctx.rng);

    let v1 = worm.end(end);
    let q = worm.k * end.sign();
    let current = if end == WormEnd::Ira { worm.dspin } else { -worm.dspin };
    let vertex1 = ctx.diagram.vertex(v1)?;
    let g = vertex1.gline(dir);
    let line = ctx.diagram.gline(g)?;
    let v2 = line.end(dir);
    if worm.is_end(v2) || worm_blocked_on_g(current, vertex1.spin(dir), dir) {
        return Ok(None);
    }
    let vertex2 = ctx.diagram.vertex(v2)?;

    let mut s1 = vertex1.state();
    s1.spin[dir.index()] = s1.spin[dir.index()].flip();
    let mut s2 = vertex2.state();
    s2.spin[dir.flip().index()] = s2.spin[dir.flip().index()].flip();
    let moved = [(v1, s1), (v2, s2)];

    let mut moved_worm = worm.clone();
    moved_worm.set_end(end, v2);
    moved_worm.weight = ctx.worm_weight_at(moved_worm.ira, moved_worm.masha, &moved)?;

    let g_weight = ctx.diagram.evaluate_gline(ctx.oracle, g, &moved, line.is_measure)?;
    let mut ratio = g_weight / line.weight;
    let mut wlines: Vec<(WLineId, WLineUpdate)> = Vec::with_capacity(2);
    for w in [vertex1.w, vertex2.w] {
        if wlines.iter().any(|(seen, _)| *seen == w) {
            continue;
        }
        let old = ctx.diagram.wline(w)?;
        let flags = WFlags {
            is_worm: ctx.diagram.touches_worm(w, Some(&moved_worm))?,
            ..ctx.diagram.wline_flags(w)?
        };
        let weight = ctx.diagram.evaluate_wline(ctx.oracle, w, &moved, flags)?;
        ratio *= weight / old.weight;
        wlines.push((
            w,
            WLineUpdate {
                weight,
                is_worm: flags.is_worm,
                ..WLineUpdate::from(old)
            },
        ));
    }
    let bias = moved_worm.weight / worm.weight;

    let patch = Patch {
        vertices: moved.to_vec(),
        glines: vec![(
            g,
            GLineUpdate {
                k: line.k - q * dir.sign(),
                weight: g_weight,
                is_measure: line.is_measure,
            },
        )],
        wlines,
        worm: WormChange::Set(moved_worm),
        ..Patch::default()
    };
    Ok(Some(Proposal { ratio, bias, patch }))
}

pub(crate) fn move_worm_on_w<R: RandomSource + ?Sized>(
    ctx: &mut MoveContext<'_, R>,
) -> Result<Option<Proposal>, DmcError> {
    let Some(worm) = ctx.diagram.worm() else {
        return Ok(None);
    };
    let end = WormEnd::from_bit(ctx.rng.int_in(0, 1));
    let v1 = worm.end(end);
    let vertex1 = ctx.diagram.vertex(v1)?;
    let w = vertex1.w;
    let line = ctx.diagram.wline(w)?;
    let v2 = line.end(vertex1.dir.flip());
    if worm.is_end(v2) {
        return Ok(None);
    }

    let mut moved_worm = worm.clone();
    moved_worm.set_end(end, v2);
    moved_worm.weight = ctx.worm_weight_at(moved_worm.ira, moved_worm.masha, &[])?;

    let weight = ctx
        .diagram
        .evaluate_wline(ctx.oracle, w, &[], ctx.diagram.wline_flags(w)?)?;
    let ratio = weight / line.weight;
    let bias = moved_worm.weight / worm.weight;
    let q = worm.k * end.sign();

    let patch = Patch {
        wlines: vec![(
            w,
            WLineUpdate {
                k: line.k + q * vertex1.dir.sign(),
                weight,
                ..WLineUpdate::from(line)
            },
        )],
        worm: WormChange::Set(moved_worm),
        ..Patch::default()
    };
    Ok(Some(Proposal { ratio, bias, patch }))
}

pub(crate) fn reconnect<R: RandomSource + ?Sized>(
    ctx: &mut MoveContext<'_, R>,
) -> Result<Option<Proposal>, DmcError> {
    let Some(worm) = ctx.diagram.worm() else {
        return Ok(None);
    };
    let ira = ctx.diagram.vertex(worm.ira)?;
    let masha = ctx.diagram.vertex(worm.masha)?;
    if ira.site != masha.site {
        return Ok(None);
    }
    let dir = random_dir(ctx.rng);
    if ira.spin(dir) != masha.spin(dir) {
        return Ok(None);
    }

    let gia = ira.gline(dir);
    let gmb = masha.gline(dir);
    let gia_line = ctx.diagram.gline(gia)?;
    let gmb_line = ctx.diagram.gline(gmb)?;
    let a = ctx.diagram.vertex(gia_line.end(dir))?.state();
    let b = ctx.diagram.vertex(gmb_line.end(dir))?.state();

    let gia_weight = ctx.propagator(dir, masha.state(), a, gia_line.is_measure);
    let gmb_weight = ctx.propagator(dir, ira.state(), b, gmb_line.is_measure);
    let ratio = -(gia_weight * gmb_weight) / (gia_line.weight * gmb_line.weight);

    let mut swapped = worm.clone();
    swapped.k = worm.k + (gmb_line.k - gia_line.k) * dir.sign();

    let patch = Patch {
        glines: vec![
            (
                gia,
                GLineUpdate {
                    weight: gia_weight,
                    ..GLineUpdate::from(gia_line)
                },
            ),
            (
                gmb,
                GLineUpdate {
                    weight: gmb_weight,
                    ..GLineUpdate::from(gmb_line)
                },
            ),
        ],
        vertex_legs: vec![(worm.masha, dir, gia), (worm.ira, dir, gmb)],
        gline_ends: vec![(gia, dir.flip(), worm.masha), (gmb, dir.flip(), worm.ira)],
        worm: WormChange::Set(swapped),
        flip_fermi_sign: true,
        ..Patch::default()
    };
    Ok(Some(Proposal {
        ratio,
        bias: 1.0,
        patch,
    }))
}
