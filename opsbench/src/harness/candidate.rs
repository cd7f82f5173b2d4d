// Copyright 2025 ToonDB Authors
//
// Licensed under the Apache License, Version 2.0

//! Benchmarked candidates and suite hooks.
//!
//! The caller picks the shape explicitly at registration time: a synchronous
//! closure invoked in tight batches, or a closure producing a future that must
//! resolve once per logical iteration.

use crate::CandidateError;
use futures::future::{self, join_all, LocalBoxFuture};
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

/// Future produced by an async candidate or hook.
pub type CandidateFuture = LocalBoxFuture<'static, Result<(), CandidateError>>;

pub type SyncFn = Box<dyn FnMut() -> Result<(), CandidateError>>;
pub type AsyncFn = Box<dyn FnMut() -> CandidateFuture>;

/// The unit of work under measurement.
pub enum Candidate {
    Sync(SyncFn),
    Async(AsyncFn),
}

impl Candidate {
    /// Infallible synchronous candidate. Its return value is passed through
    /// [`std::hint::black_box`] so the work is not optimised away.
    pub fn sync<F, R>(mut f: F) -> Self
    where
        F: FnMut() -> R + 'static,
    {
        Candidate::Sync(Box::new(move || {
            std::hint::black_box(f());
            Ok(())
        }))
    }

    /// Fallible synchronous candidate; an `Err` stops the test.
    pub fn try_sync<F, E>(mut f: F) -> Self
    where
        F: FnMut() -> Result<(), E> + 'static,
        E: fmt::Display,
    {
        Candidate::Sync(Box::new(move || {
            f().map_err(|e| CandidateError::Failed(e.to_string()))
        }))
    }

    /// Async candidate: one resolved future is one iteration.
    pub fn future<F, Fut>(mut f: F) -> Self
    where
        F: FnMut() -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        Candidate::Async(Box::new(move || f().map(|()| Ok(())).boxed_local()))
    }

    /// Fallible async candidate.
    pub fn try_future<F, Fut, E>(mut f: F) -> Self
    where
        F: FnMut() -> Fut + 'static,
        Fut: Future<Output = Result<(), E>> + 'static,
        E: fmt::Display,
    {
        Candidate::Async(Box::new(move || {
            f().map(|r| r.map_err(|e| CandidateError::Failed(e.to_string())))
                .boxed_local()
        }))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Candidate::Async(_))
    }
}

impl fmt::Debug for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Candidate::Sync(_) => write!(f, "Candidate::Sync(..)"),
            Candidate::Async(_) => write!(f, "Candidate::Async(..)"),
        }
    }
}

/// Setup or teardown step of a suite.
pub struct Hook(AsyncFn);

impl Hook {
    pub fn sync<F>(mut f: F) -> Self
    where
        F: FnMut() + 'static,
    {
        Hook(Box::new(move || {
            f();
            future::ready(Ok(())).boxed_local()
        }))
    }

    pub fn try_sync<F, E>(mut f: F) -> Self
    where
        F: FnMut() -> Result<(), E> + 'static,
        E: fmt::Display,
    {
        Hook(Box::new(move || {
            let result = f().map_err(|e| CandidateError::Failed(e.to_string()));
            future::ready(result).boxed_local()
        }))
    }

    pub fn future<F, Fut>(mut f: F) -> Self
    where
        F: FnMut() -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        Hook(Box::new(move || f().map(|()| Ok(())).boxed_local()))
    }

    pub fn try_future<F, Fut, E>(mut f: F) -> Self
    where
        F: FnMut() -> Fut + 'static,
        Fut: Future<Output = Result<(), E>> + 'static,
        E: fmt::Display,
    {
        Hook(Box::new(move || {
            f().map(|r| r.map_err(|e| CandidateError::Failed(e.to_string())))
                .boxed_local()
        }))
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hook(..)")
    }
}

/// Start `f` and guard both the call and the returned future against panics.
pub(crate) fn guarded(f: &mut AsyncFn) -> CandidateFuture {
    match panic::catch_unwind(AssertUnwindSafe(|| f())) {
        Ok(fut) => AssertUnwindSafe(fut)
            .catch_unwind()
            .map(|outcome| outcome.unwrap_or_else(|payload| Err(CandidateError::from_panic(payload))))
            .boxed_local(),
        Err(payload) => future::ready(Err(CandidateError::from_panic(payload))).boxed_local(),
    }
}

/// Run every hook concurrently and wait for all of them.
///
/// Returns the first failure in declaration order.
pub(crate) async fn run_hooks(hooks: &mut [Hook]) -> Result<(), CandidateError> {
    let pending: Vec<_> = hooks.iter_mut().map(|hook| guarded(&mut hook.0)).collect();
    join_all(pending).await.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_shape_is_explicit() {
        assert!(!Candidate::sync(|| 1 + 1).is_async());
        assert!(Candidate::future(|| async {}).is_async());
    }

    #[test]
    fn test_try_sync_maps_errors() {
        let Candidate::Sync(mut f) = Candidate::try_sync(|| Err::<(), _>("bad row")) else {
            panic!("expected sync candidate");
        };
        assert_eq!(f(), Err(CandidateError::failed("bad row")));
    }

    #[tokio::test]
    async fn test_hooks_run_and_report_first_failure() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let (a, b) = (log.clone(), log.clone());
        let mut hooks = vec![
            Hook::sync(move || a.borrow_mut().push("a")),
            Hook::try_sync(|| Err::<(), _>("first")),
            Hook::future(move || {
                let b = b.clone();
                async move { b.borrow_mut().push("b") }
            }),
            Hook::try_future(|| async { Err::<(), _>("second") }),
        ];

        let result = run_hooks(&mut hooks).await;
        assert_eq!(result, Err(CandidateError::failed("first")));
        assert_eq!(*log.borrow(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_panicking_hook_is_contained() {
        let mut hooks = vec![Hook::sync(|| panic!("no database"))];
        let result = run_hooks(&mut hooks).await;
        assert_eq!(
            result,
            Err(CandidateError::Panicked("no database".to_string()))
        );
    }
}
