//! Overflow-safe scaled integer arithmetic.
//!
//! Counters read from the kernel are large enough that multiplying two of
//! them (pages × page size, ticks × scale) can overflow `u64` even when the
//! final quotient is small. [`scaled_divide`] computes `a * b / divisor`
//! without ever overflowing an intermediate product.

/// Compute `⌊a · b / divisor⌋` without overflowing.
///
/// Returns `0` when `divisor` is zero, and `0` when the true result does not
/// fit in a `u64`. Zero is a sentinel, not a saturated value: callers scaling
/// units treat it as "no usable value".
///
/// When `a · b` fits it is computed directly. Otherwise `a` is split into
/// `q · divisor + r` and the result is `q · b + ⌊r · b / divisor⌋`. The first
/// term is overflow-checked. The second is always smaller than `b` because
/// `r < divisor`, so it is computed in a widened type and narrowed back
/// losslessly.
pub fn scaled_divide(a: u64, b: u64, divisor: u64) -> u64 {
    if divisor == 0 {
        return 0;
    }

    if b == 0 || a <= u64::MAX / b {
        return a * b / divisor;
    }

    let q = a / divisor;
    let r = a % divisor;

    let Some(whole) = q.checked_mul(b) else {
        return 0;
    };
    let Ok(fraction) = u64::try_from(u128::from(r) * u128::from(b) / u128::from(divisor)) else {
        return 0;
    };

    whole.checked_add(fraction).unwrap_or(0)
}

/// Convert a page count to KiB.
pub fn kib_from_pages(pages: u64, page_size: u64) -> u64 {
    scaled_divide(pages, page_size, 1024)
}

/// `part / whole` as a percentage, or `0.0` when `whole` is zero.
pub fn percent_of(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64) * 100.0
}
