//! Numeric solver for small systems of equations.
//!
//! The solver performs sequential elimination: it repeatedly picks an equation whose
//! residual has exactly one unbound symbol, solves it for that symbol and binds the
//! result. When a full pass binds nothing new, the remaining equations are grouped into
//! blocks that share unknowns and each block is solved simultaneously with a damped
//! Newton iteration. Elimination then resumes with the newly bound values.
//!
//! A single-unknown equation is first inverted symbolically when the unknown occurs
//! exactly once; otherwise a secant iteration is run from a fixed list of seeds, and
//! finally a bracketed bisection over a logarithmic scan. Everything is deterministic:
//! the same inputs always produce the same root.
//!
//! Where several roots exist (`x^2 = 4`), only the first one found is kept. The
//! symbolic path prefers the principal branch (positive even roots, principal trig
//! inverses). Blocks with fewer equations than unknowns, or whose Newton iteration does
//! not converge from any seed, yield no values for the unknowns involved.
use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::{FRAC_PI_2, PI};

use log::{debug, trace};
use nalgebra::{DMatrix, DVector};

use crate::{
    error::ExprError,
    expr::{BinaryOp, Equation, Expr, Function},
};

/// Seeds tried in order by the secant and Newton iterations.
const SECANT_SEEDS: [f64; 9] = [1.0, 0.5, 2.0, 10.0, 0.1, 100.0, -1.0, 1000.0, 0.01];

/// Smallest damping factor tried before a Newton step is given up.
const MIN_DAMPING: f64 = 1.0 / 1024.0;

/// Decades scanned when looking for a sign change.
const SCAN_DECADES: std::ops::RangeInclusive<i32> = -6..=6;

/// Tuning knobs for [`solve_system`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverSettings {
    /// Relative step size (and absolute residual) under which an iteration stops.
    pub tolerance: f64,
    /// Iteration cap for each secant run and each bisection.
    pub max_iterations: usize,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 200,
        }
    }
}

/// Solve `equations` for every symbol not bound in `known`.
///
/// Returns only the newly solved symbols. Unknowns that cannot be determined are
/// absent from the result rather than reported as errors; an error is returned only
/// when a known value is not finite.
pub fn solve_system(
    equations: &[Equation],
    known: &BTreeMap<String, f64>,
    settings: &SolverSettings,
) -> Result<BTreeMap<String, f64>, ExprError> {
    if let Some((name, value)) = known.iter().find(|(_, v)| !v.is_finite()) {
        return Err(ExprError::Domain(format!(
            "known value `{name} = {value}` is not finite"
        )));
    }

    let residuals: Vec<Expr> = equations.iter().map(Equation::residual).collect();
    let mut done = vec![false; residuals.len()];
    let mut values = known.clone();
    let mut solved = BTreeMap::new();

    loop {
        let mut progress = false;

        for (idx, residual) in residuals.iter().enumerate() {
            if done[idx] {
                continue;
            }

            let reduced = residual.substitute(&values);
            let free = reduced.free_symbols();
            let mut free = free.into_iter();
            let (Some(unknown), None) = (free.next(), free.next()) else {
                // Nothing left to solve in this one, or still too many unknowns.
                done[idx] = reduced.free_symbols().is_empty();
                continue;
            };

            match solve_single(&reduced, &unknown, settings) {
                Some(value) => {
                    trace!("solved `{unknown} = {value}` from `{residual} = 0`");
                    values.insert(unknown.clone(), value);
                    solved.insert(unknown, value);
                    done[idx] = true;
                    progress = true;
                }
                None => {
                    debug!("no real solution for `{unknown}` in `{reduced} = 0`");
                }
            }
        }

        if progress {
            continue;
        }

        let pending: Vec<(usize, Expr)> = residuals
            .iter()
            .enumerate()
            .filter(|(idx, _)| !done[*idx])
            .map(|(idx, residual)| (idx, residual.substitute(&values)))
            .collect();

        for (members, unknowns) in coupled_blocks(&pending) {
            if unknowns.len() < 2 {
                continue;
            }

            let block: Vec<Expr> = members.iter().map(|&i| pending[i].1.clone()).collect();
            let unknowns: Vec<String> = unknowns.into_iter().collect();
            let Some(roots) = solve_simultaneous(&block, &unknowns, settings) else {
                debug!("no simultaneous solution for {unknowns:?}");
                continue;
            };

            for (unknown, value) in unknowns.into_iter().zip(roots.iter().copied()) {
                trace!("solved `{unknown} = {value}` simultaneously");
                values.insert(unknown.clone(), value);
                solved.insert(unknown, value);
            }
            for &i in &members {
                done[pending[i].0] = true;
            }
            progress = true;
        }

        if !progress {
            break;
        }
    }

    Ok(solved)
}

/// Group residuals that share unknowns. Returns indices into `pending` with the union
/// of their free symbols, ordered by first member.
fn coupled_blocks(pending: &[(usize, Expr)]) -> Vec<(Vec<usize>, BTreeSet<String>)> {
    let mut blocks: Vec<(Vec<usize>, BTreeSet<String>)> = Vec::new();

    for (i, (_, residual)) in pending.iter().enumerate() {
        let free = residual.free_symbols();
        if free.is_empty() {
            continue;
        }

        let mut merged = (vec![i], free);
        let mut kept = Vec::with_capacity(blocks.len());
        for block in blocks.drain(..) {
            if block.1.is_disjoint(&merged.1) {
                kept.push(block);
            } else {
                merged.0.extend(block.0);
                merged.1.extend(block.1);
            }
        }
        merged.0.sort_unstable();
        kept.push(merged);
        blocks = kept;
    }

    blocks.sort_by_key(|(members, _)| members[0]);
    blocks
}

/// Damped Newton iteration on `residuals = 0` over `unknowns`.
///
/// The Jacobian is estimated by forward differences. Overdetermined blocks take
/// Gauss-Newton steps through the normal equations. Each step is halved until the
/// residual norm decreases.
fn solve_simultaneous(
    residuals: &[Expr],
    unknowns: &[String],
    settings: &SolverSettings,
) -> Option<DVector<f64>> {
    let n = unknowns.len();
    if n == 0 || residuals.len() < n {
        return None;
    }

    let f = |x: &DVector<f64>| -> Option<DVector<f64>> {
        let bindings: BTreeMap<String, f64> =
            unknowns.iter().cloned().zip(x.iter().copied()).collect();
        let values = residuals
            .iter()
            .map(|r| r.eval(&bindings).ok().filter(|v| v.is_finite()))
            .collect::<Option<Vec<f64>>>()?;
        Some(DVector::from_vec(values))
    };

    'seeds: for seed in SECANT_SEEDS {
        // Offset each unknown so symmetric systems do not start on a singular Jacobian.
        let mut x = DVector::from_fn(n, |j, _| seed * (1.0 + j as f64 / 10.0));
        let Some(mut fx) = f(&x) else { continue };
        let scale = fx.amax().max(1.0);

        for _ in 0..settings.max_iterations {
            if fx.amax() <= settings.tolerance * scale {
                return Some(x);
            }

            let Some(jacobian) = jacobian(&f, &x, &fx) else {
                continue 'seeds;
            };
            let step = if residuals.len() == n {
                jacobian.lu().solve(&(-fx.clone()))
            } else {
                let transposed = jacobian.transpose();
                (&transposed * &jacobian).lu().solve(&(-(transposed * &fx)))
            };
            let Some(step) = step else { continue 'seeds };

            let norm = fx.norm();
            let mut damping = 1.0;
            let mut next = None;
            while damping >= MIN_DAMPING {
                let trial = &x + &step * damping;
                if let Some(f_trial) = f(&trial)
                    && f_trial.norm() < norm
                {
                    next = Some((trial, f_trial));
                    break;
                }
                damping *= 0.5;
            }
            let Some((trial, f_trial)) = next else { break };

            let small_step = (&trial - &x).amax() <= settings.tolerance * trial.amax().max(1.0);
            (x, fx) = (trial, f_trial);
            if small_step {
                break;
            }
        }

        if accept(fx.amax(), scale, settings) {
            return Some(x);
        }
    }

    None
}

/// Forward difference Jacobian of `f` at `x`, where `fx = f(x)`.
fn jacobian(
    f: &impl Fn(&DVector<f64>) -> Option<DVector<f64>>,
    x: &DVector<f64>,
    fx: &DVector<f64>,
) -> Option<DMatrix<f64>> {
    let mut jacobian = DMatrix::zeros(fx.len(), x.len());
    for j in 0..x.len() {
        let h = f64::EPSILON.sqrt() * x[j].abs().max(1.0);
        let mut shifted = x.clone();
        shifted[j] += h;
        let f_shifted = f(&shifted)?;
        jacobian.set_column(j, &((f_shifted - fx) / h));
    }
    Some(jacobian)
}

/// Solve `residual = 0` where `symbol` is the only free symbol.
pub fn solve_single(residual: &Expr, symbol: &str, settings: &SolverSettings) -> Option<f64> {
    let f = |x: f64| -> Option<f64> {
        let bindings = BTreeMap::from([(symbol.to_string(), x)]);
        residual.eval(&bindings).ok().filter(|v| v.is_finite())
    };

    if residual.occurrences(symbol) == 1
        && let Some(x) = isolate(residual, 0.0, symbol)
        && x.is_finite()
        && f(x).is_some_and(|r| accept(r, r.abs().max(1.0), settings))
    {
        return Some(x);
    }

    secant(&f, settings).or_else(|| bisect(&f, settings))
}

/// Residual acceptance: small relative to the scale of the residual at the start.
fn accept(residual: f64, scale: f64, settings: &SolverSettings) -> bool {
    residual.abs() <= settings.tolerance.sqrt() * scale
}

/// Invert `expr = target` for the single occurrence of `symbol`.
fn isolate(expr: &Expr, target: f64, symbol: &str) -> Option<f64> {
    let constant = |e: &Expr| e.eval(&BTreeMap::new()).ok();

    match expr {
        Expr::Symbol(name) if name == symbol => Some(target),
        Expr::Neg(inner) => isolate(inner, -target, symbol),
        Expr::Binary(op, lhs, rhs) => {
            let in_lhs = lhs.contains(symbol);
            let (side, other) = if in_lhs { (lhs, rhs) } else { (rhs, lhs) };
            let c = constant(other)?;

            let next = match (op, in_lhs) {
                (BinaryOp::Add, _) => target - c,
                (BinaryOp::Sub, true) => target + c,
                (BinaryOp::Sub, false) => c - target,
                (BinaryOp::Mul, _) => {
                    if c == 0.0 {
                        return None;
                    }
                    target / c
                }
                (BinaryOp::Div, true) => target * c,
                (BinaryOp::Div, false) => {
                    if target == 0.0 {
                        return None;
                    }
                    c / target
                }
                (BinaryOp::Pow, true) => real_root(target, c)?,
                (BinaryOp::Pow, false) => {
                    if c <= 0.0 || c == 1.0 || target <= 0.0 {
                        return None;
                    }
                    target.ln() / c.ln()
                }
            };

            isolate(side, next, symbol)
        }
        Expr::Call(func, args) if args.len() == 1 => {
            let t = target;
            let next = match func {
                Function::Sqrt => (t >= 0.0).then(|| t * t)?,
                Function::Exp => (t > 0.0).then(|| t.ln())?,
                Function::Ln => t.exp(),
                Function::Log10 => 10f64.powf(t),
                Function::Sin => (t.abs() <= 1.0).then(|| t.asin())?,
                Function::Cos => (t.abs() <= 1.0).then(|| t.acos())?,
                Function::Tan => t.atan(),
                Function::Asin => (t.abs() <= FRAC_PI_2).then(|| t.sin())?,
                Function::Acos => (0.0..=PI).contains(&t).then(|| t.cos())?,
                Function::Atan => (t.abs() < FRAC_PI_2).then(|| t.tan())?,
                Function::Abs => (t >= 0.0).then_some(t)?,
            };
            isolate(&args[0], next, symbol)
        }
        _ => None,
    }
}

/// Real solution of `x^exponent = target`, positive branch first.
fn real_root(target: f64, exponent: f64) -> Option<f64> {
    if exponent == 0.0 {
        return None;
    }

    if target >= 0.0 {
        return Some(target.powf(exponent.recip()));
    }

    // Negative targets only have a real root for odd integer exponents.
    let odd_integer = exponent.fract() == 0.0 && (exponent as i64) % 2 != 0;
    odd_integer.then(|| -(-target).powf(exponent.recip()))
}

fn secant(f: &impl Fn(f64) -> Option<f64>, settings: &SolverSettings) -> Option<f64> {
    for seed in SECANT_SEEDS {
        let Some(f_seed) = f(seed) else { continue };
        let scale = f_seed.abs().max(1.0);

        let mut x0 = seed;
        let mut f0 = f_seed;
        let mut x1 = seed * (1.0 + 1e-4) + 1e-4;
        let Some(mut f1) = f(x1) else { continue };

        for _ in 0..settings.max_iterations {
            if f1 == 0.0 {
                return Some(x1);
            }

            let denom = f1 - f0;
            if denom == 0.0 {
                break;
            }

            let x2 = x1 - f1 * (x1 - x0) / denom;
            let Some(f2) = f(x2).filter(|_| x2.is_finite()) else {
                break;
            };

            if (x2 - x1).abs() <= settings.tolerance * x2.abs().max(1.0) {
                if accept(f2, scale, settings) {
                    return Some(x2);
                }
                break;
            }

            (x0, f0, x1, f1) = (x1, f1, x2, f2);
        }
    }

    None
}

fn bisect(f: &impl Fn(f64) -> Option<f64>, settings: &SolverSettings) -> Option<f64> {
    let mut grid: Vec<f64> = SCAN_DECADES
        .flat_map(|k| {
            let x = 10f64.powi(k);
            [x, -x]
        })
        .chain(std::iter::once(0.0))
        .collect();
    grid.sort_by(f64::total_cmp);

    let samples: Vec<(f64, f64)> = grid
        .into_iter()
        .filter_map(|x| f(x).map(|y| (x, y)))
        .collect();

    // Prefer brackets on the positive axis, scanning outwards from zero.
    let mut brackets: Vec<((f64, f64), (f64, f64))> = samples
        .windows(2)
        .filter(|w| w[0].1.signum() != w[1].1.signum() || w[0].1 == 0.0)
        .map(|w| (w[0], w[1]))
        .collect();
    brackets.sort_by(|a, b| {
        let key = |x: f64| (x < 0.0, x.abs());
        let (ka, kb) = (key(a.0.0), key(b.0.0));
        ka.0.cmp(&kb.0).then(ka.1.total_cmp(&kb.1))
    });

    for ((mut lo, mut f_lo), (mut hi, f_hi)) in brackets {
        if f_lo == 0.0 {
            return Some(lo);
        }
        let scale = f_lo.abs().max(f_hi.abs()).max(1.0);

        for _ in 0..settings.max_iterations {
            let mid = 0.5 * (lo + hi);
            let Some(f_mid) = f(mid) else { break };

            if f_mid == 0.0 || (hi - lo).abs() <= settings.tolerance * mid.abs().max(1.0) {
                // A sign change across a pole also narrows down; reject those.
                if accept(f_mid, scale, settings) {
                    return Some(mid);
                }
                break;
            }

            if f_mid.signum() == f_lo.signum() {
                (lo, f_lo) = (mid, f_mid);
            } else {
                hi = mid;
            }
        }
    }

    None
}
