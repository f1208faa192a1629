//! Stream adapters shared by directory subscriptions.

use futures::future;
use futures::stream::{self, BoxStream, Stream, StreamExt};

use super::{DirectoryError, DirectoryResult};

/// Suppress consecutive duplicate snapshots and end the stream right after
/// the first error.
pub fn snapshots<S, T>(source: S) -> BoxStream<'static, DirectoryResult<T>>
where
    S: Stream<Item = DirectoryResult<T>> + Send + 'static,
    T: PartialEq + Clone + Send + 'static,
{
    until_error(distinct_until_changed(source)).boxed()
}

/// A stream that yields a single error and ends.
pub fn failed<T>(error: DirectoryError) -> BoxStream<'static, DirectoryResult<T>>
where
    T: Send + 'static,
{
    stream::once(future::ready(Err(error))).boxed()
}

/// Drop items equal to the one emitted just before them.
pub fn distinct_until_changed<S, T>(source: S) -> impl Stream<Item = T>
where
    S: Stream<Item = T>,
    T: PartialEq + Clone,
{
    source
        .scan(None::<T>, |last, item| {
            let changed = last.as_ref() != Some(&item);
            if changed {
                *last = Some(item.clone());
            }
            future::ready(Some(changed.then_some(item)))
        })
        .filter_map(future::ready)
}

/// Pass items through until (and including) the first `Err`.
pub fn until_error<S, T, E>(source: S) -> impl Stream<Item = Result<T, E>>
where
    S: Stream<Item = Result<T, E>>,
{
    source.scan(false, |errored, item| {
        if *errored {
            return future::ready(None);
        }
        *errored = item.is_err();
        future::ready(Some(item))
    })
}
