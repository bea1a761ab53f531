//! Row-wise duplicate detection.
//!
//! Two rows are duplicates when every cell is equal; nulls compare equal to
//! nulls. The first occurrence of a row is never counted as a duplicate.
//! Rows are compared cell by cell by polars, so no value can leak into a
//! neighbouring column.

use polars::prelude::*;

/// Frame with every repeated row removed, first occurrences kept in order.
pub(crate) fn drop_duplicate_rows(df: &DataFrame) -> PolarsResult<DataFrame> {
    if df.height() <= 1 || df.width() == 0 {
        return Ok(df.clone());
    }
    df.unique_stable(None, UniqueKeepStrategy::First, None)
}

/// Number of rows equal to some earlier row.
pub(crate) fn count_duplicate_rows(df: &DataFrame) -> PolarsResult<usize> {
    if df.height() <= 1 || df.width() == 0 {
        return Ok(0);
    }
    let unique = df.unique::<&str, &str>(None, UniqueKeepStrategy::First, None)?;
    Ok(df.height() - unique.height())
}
