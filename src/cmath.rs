//! `ldexp`/`frexp` for the log-exponential histogram binning. Rust dropped
//! these from `f64`; both lean on libc, with `ldexp` shifting the exponent
//! field directly whenever input and result are normal numbers.
use libc::c_int;

mod ffi {
    use libc::{c_double, c_int};

    extern "C" {
        pub fn ldexp(x: c_double, n: c_int) -> c_double;
        pub fn frexp(n: c_double, value: &mut c_int) -> c_double;
    }
}

const EXP_SHIFT: u32 = 52;
const EXP_MASK: u64 = 0x7ff << EXP_SHIFT;

/// `frac * 2^exp`
pub fn ldexp(frac: f64, exp: isize) -> f64 {
    let bits = frac.to_bits();
    let biased = ((bits & EXP_MASK) >> EXP_SHIFT) as isize;
    let target = biased.saturating_add(exp);
    // 0 marks zero/subnormals and 0x7ff inf/nan; both need libc's rounding.
    if biased != 0 && biased != 0x7ff && (1..0x7ff).contains(&target) {
        return f64::from_bits((bits & !EXP_MASK) | ((target as u64) << EXP_SHIFT));
    }
    let exp = exp.clamp(c_int::MIN as isize, c_int::MAX as isize) as c_int;
    unsafe { ffi::ldexp(frac, exp) }
}

/// Split `value` into a fraction in `[0.5, 1)` and a power of two.
pub fn frexp(value: f64) -> (f64, isize) {
    let mut exp: c_int = 0;
    let frac = unsafe { ffi::frexp(value, &mut exp) };
    (frac, exp as isize)
}
