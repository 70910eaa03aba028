//! Multi-path fan-out
//!
//! One operation is run for every path concurrently and the per-path
//! results are folded by a [`Combine`] strategy. The paths are independent;
//! the first failure fails the whole call and the other in-flight
//! operations are dropped.

use fireman_core::json::merge_owned;
use fireman_core::Result;
use futures::future::try_join_all;
use serde_json::{Map, Value};
use std::future::Future;

/// Folds per-path results into one value
pub trait Combine<T> {
    /// Combined result
    type Output;

    /// Fold `results`, given in path order
    fn combine(&self, results: Vec<T>) -> Self::Output;
}

/// Shallow-merge object results; later paths win. `None` when no path
/// returned an object.
#[derive(Debug, Default, Clone, Copy)]
pub struct MergeObjects;

impl Combine<Value> for MergeObjects {
    type Output = Option<Map<String, Value>>;

    fn combine(&self, results: Vec<Value>) -> Self::Output {
        merge_owned(results)
    }
}

/// Concatenate list results in path order
#[derive(Debug, Default, Clone, Copy)]
pub struct Concat;

impl<T> Combine<Vec<T>> for Concat {
    type Output = Vec<T>;

    fn combine(&self, results: Vec<Vec<T>>) -> Self::Output {
        results.into_iter().flatten().collect()
    }
}

/// Drop the results
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

impl<T> Combine<T> for Discard {
    type Output = ();

    fn combine(&self, _results: Vec<T>) -> Self::Output {}
}

/// Run `f` for each path concurrently and combine the results
pub async fn for_each_path<'a, P, T, C, F, Fut>(
    paths: &'a [P],
    strategy: C,
    f: F,
) -> Result<C::Output>
where
    P: AsRef<str>,
    C: Combine<T>,
    F: Fn(&'a str) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let results = try_join_all(paths.iter().map(|path| f(path.as_ref()))).await?;
    Ok(strategy.combine(results))
}
