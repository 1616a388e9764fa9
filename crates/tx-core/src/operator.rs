use std::fmt::Debug;
use std::sync::Arc;

use log::warn;

use crate::capability::{self, CapabilityKind, CapabilityValue};
use crate::dtype::{DType, Scalar};
use crate::error::Result;
use crate::executor::Executor;
use crate::shape::Shape;

/// Behaviour shared by every node of an operator tree, independent of its value type.
///
/// Composite nodes forward `prepare` and `release` to their children. Nodes that
/// own a temporary allocate it in `prepare` and free it in `release`.
pub trait Node: Send + Sync + Debug {
    /// Human readable name used in errors and logs.
    fn name(&self) -> String;

    /// Answers a capability query. Leaves default to the kind's default value.
    fn capability(&self, kind: CapabilityKind) -> CapabilityValue {
        kind.default_value()
    }

    /// True when this node or a descendant owns a temporary that must be prepared.
    fn needs_prepare(&self) -> bool {
        false
    }

    fn prepare(&self, _ex: &dyn Executor) -> Result<()> {
        Ok(())
    }

    fn release(&self, _ex: &dyn Executor) -> Result<()> {
        Ok(())
    }
}

/// A lazily evaluated, read-only view of an N-dimensional value.
pub trait Operator: Node {
    type Value: Scalar;

    fn rank(&self) -> usize;

    /// Size of dimension `dim`. `dim` must be below `rank()`.
    fn size(&self, dim: usize) -> usize;

    /// Reads the element at `idx`, which must have `rank()` in-bounds coordinates.
    fn read(&self, idx: &[usize]) -> Result<Self::Value>;

    fn shape(&self) -> Shape {
        Shape::new((0..self.rank()).map(|d| self.size(d)).collect())
    }

    fn total_size(&self) -> usize {
        (0..self.rank()).map(|d| self.size(d)).product()
    }

    fn dtype(&self) -> DType {
        <Self::Value as Scalar>::DTYPE
    }
}

/// An operator that can also be written through (an lvalue).
pub trait OperatorMut: Operator {
    fn write(&self, idx: &[usize], value: Self::Value) -> Result<()>;

    /// Stores a full row-major buffer of `total_size()` values.
    fn store(&self, values: &[Self::Value]) -> Result<()> {
        let shape = self.shape();
        let mut idx = shape.unravel(0);
        for &v in values.iter().take(shape.numel()) {
            self.write(&idx, v)?;
            shape.increment(&mut idx);
        }
        Ok(())
    }
}

/// Folds the answers of `children` for `kind`.
pub fn fold_children(kind: CapabilityKind, children: &[&dyn Node]) -> CapabilityValue {
    capability::fold(kind, children.iter().map(|c| c.capability(kind)))
}

/// Prepares `children` in order.
///
/// If one fails, the ones already prepared are released in reverse order before
/// the error is returned.
pub fn prepare_children(children: &[&dyn Node], ex: &dyn Executor) -> Result<()> {
    for (i, child) in children.iter().enumerate() {
        if let Err(err) = child.prepare(ex) {
            for done in children[..i].iter().rev() {
                if let Err(release_err) = done.release(ex) {
                    warn!(
                        "release of {} after failed prepare of {}: {}",
                        done.name(),
                        child.name(),
                        release_err
                    );
                }
            }
            return Err(err);
        }
    }
    Ok(())
}

/// Releases `children` in reverse order. Every child is released; the first
/// error is returned.
pub fn release_children(children: &[&dyn Node], ex: &dyn Executor) -> Result<()> {
    let mut first = None;
    for child in children.iter().rev() {
        if let Err(err) = child.release(ex) {
            first.get_or_insert(err);
        }
    }
    match first {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

macro_rules! forward_pointer {
    ($ptr:ident) => {
        impl<N: Node + ?Sized> Node for $ptr<N> {
            fn name(&self) -> String {
                (**self).name()
            }

            fn capability(&self, kind: CapabilityKind) -> CapabilityValue {
                (**self).capability(kind)
            }

            fn needs_prepare(&self) -> bool {
                (**self).needs_prepare()
            }

            fn prepare(&self, ex: &dyn Executor) -> Result<()> {
                (**self).prepare(ex)
            }

            fn release(&self, ex: &dyn Executor) -> Result<()> {
                (**self).release(ex)
            }
        }

        impl<O: Operator + ?Sized> Operator for $ptr<O> {
            type Value = O::Value;

            fn rank(&self) -> usize {
                (**self).rank()
            }

            fn size(&self, dim: usize) -> usize {
                (**self).size(dim)
            }

            fn read(&self, idx: &[usize]) -> Result<Self::Value> {
                (**self).read(idx)
            }
        }

        impl<O: OperatorMut + ?Sized> OperatorMut for $ptr<O> {
            fn write(&self, idx: &[usize], value: Self::Value) -> Result<()> {
                (**self).write(idx, value)
            }

            fn store(&self, values: &[Self::Value]) -> Result<()> {
                (**self).store(values)
            }
        }
    };
}

forward_pointer!(Arc);
forward_pointer!(Box);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TensorError;
    use crate::host::HostExecutor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug)]
    struct Recorder {
        label: &'static str,
        fail: bool,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Node for Recorder {
        fn name(&self) -> String {
            self.label.to_string()
        }

        fn prepare(&self, _ex: &dyn Executor) -> Result<()> {
            self.log.lock().unwrap().push(format!("prepare {}", self.label));
            if self.fail {
                return Err(TensorError::Execution(format!("{} failed", self.label)));
            }
            Ok(())
        }

        fn release(&self, _ex: &dyn Executor) -> Result<()> {
            self.log.lock().unwrap().push(format!("release {}", self.label));
            Ok(())
        }
    }

    fn recorder(label: &'static str, fail: bool, log: &Arc<Mutex<Vec<String>>>) -> Recorder {
        Recorder {
            label,
            fail,
            log: Arc::clone(log),
        }
    }

    #[test]
    fn test_failed_prepare_releases_prepared_siblings() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = recorder("a", false, &log);
        let b = recorder("b", false, &log);
        let c = recorder("c", true, &log);
        let ex = HostExecutor::new();
        let err = prepare_children(&[&a, &b, &c], &ex).unwrap_err();
        assert_eq!(err.to_string(), "c failed");
        assert_eq!(
            *log.lock().unwrap(),
            vec!["prepare a", "prepare b", "prepare c", "release b", "release a"]
        );
    }

    #[test]
    fn test_release_children_reverse_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = recorder("a", false, &log);
        let b = recorder("b", false, &log);
        let ex = HostExecutor::new();
        release_children(&[&a, &b], &ex).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["release b", "release a"]);
    }

    #[derive(Debug)]
    struct Counter {
        hits: AtomicUsize,
    }

    impl Node for Counter {
        fn name(&self) -> String {
            "counter".into()
        }
    }

    impl Operator for Counter {
        type Value = i32;

        fn rank(&self) -> usize {
            2
        }

        fn size(&self, dim: usize) -> usize {
            [2, 3][dim]
        }

        fn read(&self, idx: &[usize]) -> Result<i32> {
            self.hits.fetch_add(1, Ordering::Relaxed);
            Ok((idx[0] * 3 + idx[1]) as i32)
        }
    }

    #[test]
    fn test_default_shape_and_pointer_forwarding() {
        let op: Arc<dyn Operator<Value = i32>> = Arc::new(Counter {
            hits: AtomicUsize::new(0),
        });
        assert_eq!(op.shape().dims(), &[2, 3]);
        assert_eq!(op.total_size(), 6);
        assert_eq!(op.dtype(), DType::I32);
        assert_eq!(op.read(&[1, 2]).unwrap(), 5);
        assert_eq!(
            op.capability(CapabilityKind::Parallel),
            CapabilityValue::Flag(true)
        );
    }
}
