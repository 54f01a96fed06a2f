//! Order-changing updates. Both only run in the worm sector: the new
//! interaction line is hung between the propagators leaving Ira and Masha on
//! the same leg, and the worm absorbs its momentum.

use dmc_core::{Dir, DmcError, Momentum, RandomSource, MOMENTUM_SPACE};
use dmc_diagram::{VertexState, WFlags};

use crate::dispatch::MoveKind;
use crate::proposal::{
    GLineUpdate, InsertPair, MoveContext, Patch, Proposal, RemovePair, Splice, WLineUpdate,
    WormChange,
};
use crate::rules::{random_dir, random_tau, tau_probability};

/// Reverse-over-forward proposal density of inserting one interaction line.
fn insertion_factor(beta: f64) -> f64 {
    let p = tau_probability(beta);
    2.0 * MOMENTUM_SPACE as f64 / (p * p)
}

pub(crate) fn add_interaction<R: RandomSource + ?Sized>(
    ctx: &mut MoveContext<'_, R>,
) -> Result<Option<Proposal>, DmcError> {
    let Some(worm) = ctx.diagram.worm() else {
        return Ok(None);
    };
    let order = ctx.diagram.order();
    if order >= ctx.bias.max_order {
        return Ok(None);
    }
    let beta = ctx.diagram.beta();
    let k_w = Momentum::random(ctx.rng);
    let dir = random_dir(ctx.rng);
    let dir_w = random_dir(ctx.rng);
    let tau_a = random_tau(ctx.rng, beta);
    let tau_b = random_tau(ctx.rng, beta);

    let ira = ctx.diagram.vertex(worm.ira)?;
    let masha = ctx.diagram.vertex(worm.masha)?;
    let gic = ira.gline(dir);
    let gmd = masha.gline(dir);
    let gic_line = ctx.diagram.gline(gic)?;
    let gmd_line = ctx.diagram.gline(gmd)?;
    let c_id = gic_line.end(dir);
    let d_id = gmd_line.end(dir);
    let c = ctx.diagram.vertex(c_id)?.state();
    let d = ctx.diagram.vertex(d_id)?.state();

    let a = VertexState {
        site: c.site,
        tau: tau_a,
        spin: [ira.spin(dir); 2],
    };
    let b = VertexState {
        site: d.site,
        tau: tau_b,
        spin: [masha.spin(dir); 2],
    };

    // W momentum runs from ends[In] to ends[Out] and A sits at ends[dir_w]
    let shift = k_w * (dir.sign() * dir_w.sign());
    let gia = GLineUpdate {
        k: gic_line.k - shift,
        weight: ctx.propagator(dir, ira.state(), a, false),
        is_measure: false,
    };
    let gac = GLineUpdate {
        k: gic_line.k,
        weight: ctx.propagator(dir, a, c, gic_line.is_measure),
        is_measure: gic_line.is_measure,
    };
    let gmb = GLineUpdate {
        k: gmd_line.k + shift,
        weight: ctx.propagator(dir, masha.state(), b, false),
        is_measure: false,
    };
    let gbd = GLineUpdate {
        k: gmd_line.k,
        weight: ctx.propagator(dir, b, d, gmd_line.is_measure),
        is_measure: gmd_line.is_measure,
    };
    let (from, to) = match dir_w {
        Dir::In => (a, b),
        Dir::Out => (b, a),
    };
    let w = WLineUpdate {
        k: k_w,
        weight: ctx
            .oracle
            .interaction(&from.w_end(), &to.w_end(), WFlags::default()),
        is_measure: false,
        is_delta: false,
        is_worm: false,
    };

    let ratio = -(w.weight * gia.weight * gac.weight * gmb.weight * gbd.weight)
        / (gic_line.weight * gmd_line.weight);
    let bias = ctx.bias.order_ratio(order, order + 1)
        * ctx.selection_ratio(MoveKind::AddInteraction)
        * insertion_factor(beta);

    let mut shifted = worm.clone();
    shifted.k = worm.k - k_w * dir_w.sign();

    let patch = Patch {
        worm: WormChange::Set(shifted),
        splice: Some(Splice::Insert(Box::new(InsertPair {
            dir,
            dir_w,
            ira: worm.ira,
            masha: worm.masha,
            c: c_id,
            d: d_id,
            gic,
            gmd,
            a,
            b,
            w,
            gia,
            gac,
            gmb,
            gbd,
        }))),
        ..Patch::default()
    };
    Ok(Some(Proposal { ratio, bias, patch }))
}

pub(crate) fn delete_interaction<R: RandomSource + ?Sized>(
    ctx: &mut MoveContext<'_, R>,
) -> Result<Option<Proposal>, DmcError> {
    let Some(worm) = ctx.diagram.worm() else {
        return Ok(None);
    };
    let order = ctx.diagram.order();
    if order <= 1 {
        return Ok(None);
    }
    let dir = random_dir(ctx.rng);

    let ira = ctx.diagram.vertex(worm.ira)?;
    let masha = ctx.diagram.vertex(worm.masha)?;
    let gia = ira.gline(dir);
    let gmb = masha.gline(dir);
    let gia_line = ctx.diagram.gline(gia)?;
    let gmb_line = ctx.diagram.gline(gmb)?;
    let a_id = gia_line.end(dir);
    let b_id = gmb_line.end(dir);
    let a = ctx.diagram.vertex(a_id)?;
    let b = ctx.diagram.vertex(b_id)?;
    if a.w != b.w || !a.is_diagonal() || !b.is_diagonal() {
        return Ok(None);
    }
    let w_line = ctx.diagram.wline(a.w)?;
    if w_line.is_delta || w_line.is_measure || w_line.is_worm {
        return Ok(None);
    }
    if gia_line.is_measure || gmb_line.is_measure {
        return Ok(None);
    }
    let gac = a.gline(dir);
    let gbd = b.gline(dir);
    let gac_line = ctx.diagram.gline(gac)?;
    let gbd_line = ctx.diagram.gline(gbd)?;
    let c_id = gac_line.end(dir);
    let d_id = gbd_line.end(dir);
    let c = ctx.diagram.vertex(c_id)?.state();
    let d = ctx.diagram.vertex(d_id)?.state();
    if a.site != c.site || b.site != d.site {
        return Ok(None);
    }

    let gic = GLineUpdate {
        k: gac_line.k,
        weight: ctx.propagator(dir, ira.state(), c, gac_line.is_measure),
        is_measure: gac_line.is_measure,
    };
    let gmd = GLineUpdate {
        k: gbd_line.k,
        weight: ctx.propagator(dir, masha.state(), d, gbd_line.is_measure),
        is_measure: gbd_line.is_measure,
    };

    let ratio = -(gic.weight * gmd.weight)
        / (gia_line.weight * gac_line.weight * gmb_line.weight * gbd_line.weight * w_line.weight);
    let bias = ctx.bias.order_ratio(order, order - 1)
        * ctx.selection_ratio(MoveKind::DeleteInteraction)
        / insertion_factor(ctx.diagram.beta());

    let mut shifted = worm.clone();
    shifted.k = worm.k + w_line.k * a.dir.sign();

    let patch = Patch {
        worm: WormChange::Set(shifted),
        splice: Some(Splice::Remove(Box::new(RemovePair {
            dir,
            ira: worm.ira,
            masha: worm.masha,
            a: a_id,
            b: b_id,
            c: c_id,
            d: d_id,
            w: a.w,
            old_glines: [gia, gac, gmb, gbd],
            gic,
            gmd,
        }))),
        ..Patch::default()
    };
    Ok(Some(Proposal { ratio, bias, patch }))
}
