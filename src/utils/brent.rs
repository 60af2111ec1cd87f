//! Brent's one-dimensional minimization
//!
//! Golden-section search with parabolic steps, as in Praat's
//! `NUMminimize_brent` (after Brent 1973 and Forsythe, Malcolm & Moler).

/// 1 - (sqrt(5) - 1) / 2
const GOLDEN: f64 = 0.381_966_011_250_105_1;

const MAX_ITERATIONS: usize = 60;

/// Minimize `f` on the interval `[a, b]`
///
/// Returns `(x, f(x))` for the located minimum. `tol` is the absolute
/// tolerance on `x`; it must be positive and `a < b`.
pub fn minimize_brent<F>(mut f: F, mut a: f64, mut b: f64, tol: f64) -> (f64, f64)
where
    F: FnMut(f64) -> f64,
{
    debug_assert!(tol > 0.0 && a < b);
    let sqrt_epsilon = f64::EPSILON.sqrt();

    // First step: golden section
    let mut v = a + GOLDEN * (b - a);
    let mut fv = f(v);
    let mut x = v;
    let mut w = v;
    let mut fx = fv;
    let mut fw = fv;

    for _ in 0..MAX_ITERATIONS {
        let range = b - a;
        let middle_range = 0.5 * (a + b);
        let tol_act = sqrt_epsilon * x.abs() + tol / 3.0;

        if (x - middle_range).abs() + 0.5 * range <= 2.0 * tol_act {
            return (x, fx);
        }

        let mut new_step = GOLDEN * if x < middle_range { b - x } else { a - x };

        // Try a parabolic step through x, w, v
        if (x - w).abs() >= tol_act {
            let t = (x - w) * (fx - fv);
            let mut q = (x - v) * (fx - fw);
            let mut p = (x - v) * q - (x - w) * t;
            q = 2.0 * (q - t);
            if q > 0.0 {
                p = -p;
            } else {
                q = -q;
            }
            if p.abs() < (new_step * q).abs()
                && p > q * (a - x + 2.0 * tol_act)
                && p < q * (b - x - 2.0 * tol_act)
            {
                new_step = p / q;
            }
        }

        if new_step.abs() < tol_act {
            new_step = if new_step > 0.0 { tol_act } else { -tol_act };
        }

        let t = x + new_step;
        let ft = f(t);

        if ft <= fx {
            if t < x {
                b = x;
            } else {
                a = x;
            }
            v = w;
            w = x;
            x = t;
            fv = fw;
            fw = fx;
            fx = ft;
        } else {
            if t < x {
                a = t;
            } else {
                b = t;
            }
            if ft <= fw || w == x {
                v = w;
                w = t;
                fv = fw;
                fw = ft;
            } else if ft <= fv || v == x || v == w {
                v = t;
                fv = ft;
            }
        }
    }

    log::warn!("minimize_brent: maximum number of iterations exceeded");
    (x, fx)
}
