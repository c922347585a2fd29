//
//  vend-client
//  api/serial.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

//! Serial chain combinator.
//!
//! [`run_serially`] runs one unit of work per element of a collection,
//! strictly one after the other. Element `i + 1` starts only after the merge
//! of element `i` has completed, because `advance` mutates shared arguments
//! that the next unit reads.

use std::future::Future;

use tracing::debug;

use super::common::ApiError;

/// Left-folds `execute` over `items[start..]`.
///
/// For each index `i`:
///
/// 1. `execute(&items[i], shared)` produces a result
/// 2. `merge(result, accumulator, shared)` produces the next accumulator
/// 3. `advance(shared, i + 1)` points the shared arguments at the next element
///
/// # Returns
///
/// The final accumulator, or `init` unchanged when `start` is past the end
/// (`None` if no accumulator was ever produced).
///
/// # Errors
///
/// The first error from `execute` or `merge` stops the chain.
///
/// # Example
///
/// ```rust
/// use vend_client::api::{run_serially, ApiError};
///
/// # tokio_test::block_on(async {
/// let ids = ["c-1", "c-2"];
/// let mut current = 0usize;
///
/// let joined = run_serially(
///     &ids,
///     0,
///     &mut current,
///     |id, _| {
///         let id = id.to_string();
///         async move { Ok::<String, ApiError>(id) }
///     },
///     |id, acc: Option<String>, _| Ok(match acc {
///         Some(acc) => format!("{},{}", acc, id),
///         None => id,
///     }),
///     |current, next| *current = next,
///     None,
/// )
/// .await?;
///
/// assert_eq!(joined.as_deref(), Some("c-1,c-2"));
/// assert_eq!(current, 2);
/// # Ok::<(), ApiError>(())
/// # });
/// ```
pub async fn run_serially<T, S, R, A, E, Fut, M, V>(
    items: &[T],
    start: usize,
    shared: &mut S,
    mut execute: E,
    mut merge: M,
    mut advance: V,
    init: Option<A>,
) -> Result<Option<A>, ApiError>
where
    E: FnMut(&T, &S) -> Fut,
    Fut: Future<Output = Result<R, ApiError>>,
    M: FnMut(R, Option<A>, &S) -> Result<A, ApiError>,
    V: FnMut(&mut S, usize),
{
    let mut accumulator = init;

    for (index, item) in items.iter().enumerate().skip(start) {
        debug!(index, total = items.len(), "serial chain step");
        let result = execute(item, shared).await?;
        accumulator = Some(merge(result, accumulator, shared)?);
        advance(shared, index + 1);
    }

    Ok(accumulator)
}
