//! Per-call argument slots.

use std::any::Any;
use std::sync::Arc;

use callisto_codec::{TypeDesc, Value};

use crate::error::{ArgumentFault, InvokeError, MethodError};
use crate::service::ParameterWay;

enum Slot {
    /// Decoded input; `None` once the handler took it.
    Val(Option<Value>),
    /// Decoded input that is written back after the call.
    Ref(Value),
    /// Output; `None` until the handler assigns it.
    Out(Option<Value>),
}

/// The arguments of one invocation, one slot per declared parameter.
///
/// Handlers read inputs with [`take`](Self::take) or [`get`](Self::get),
/// update `Ref` parameters in place with [`get_mut`](Self::get_mut), and
/// assign `Ref`/`Out` parameters with [`set`](Self::set). Whatever the
/// `Ref`/`Out` slots hold when the call returns is encoded into the response.
pub struct Arguments {
    slots: Vec<Slot>,
    generics: Arc<[TypeDesc]>,
}

impl Arguments {
    pub(crate) fn with_capacity(len: usize, generics: Arc<[TypeDesc]>) -> Self {
        Arguments {
            slots: Vec::with_capacity(len),
            generics,
        }
    }

    pub(crate) fn push_val(&mut self, value: Value) {
        self.slots.push(Slot::Val(Some(value)));
    }

    pub(crate) fn push_ref(&mut self, value: Value) {
        self.slots.push(Slot::Ref(value));
    }

    pub(crate) fn push_out(&mut self) {
        self.slots.push(Slot::Out(None));
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn way(&self, index: usize) -> Option<ParameterWay> {
        self.slots.get(index).map(|slot| match slot {
            Slot::Val(_) => ParameterWay::Val,
            Slot::Ref(_) => ParameterWay::Ref,
            Slot::Out(_) => ParameterWay::Out,
        })
    }

    /// Concrete types the method's generic parameters were instantiated with,
    /// in declaration order.
    pub fn generic_arguments(&self) -> &[TypeDesc] {
        &self.generics
    }

    /// Move a `Val` argument out of its slot.
    pub fn take<T: Any>(&mut self, index: usize) -> Result<T, MethodError> {
        match self.take_value(index)?.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(value) => {
                // put it back so a retry with the right type still works
                self.slots[index] = Slot::Val(Some(value));
                Err(MethodError::Argument {
                    index,
                    reason: ArgumentFault::WrongType {
                        expected: std::any::type_name::<T>(),
                    },
                })
            }
        }
    }

    /// Move a `Val` argument out without naming its type. Generic methods
    /// use this to pass values through untouched.
    pub fn take_value(&mut self, index: usize) -> Result<Value, MethodError> {
        let fault = |reason| MethodError::Argument { index, reason };
        match self.slots.get_mut(index).ok_or(fault(ArgumentFault::OutOfRange))? {
            Slot::Val(value) => value.take().ok_or(fault(ArgumentFault::AlreadyTaken)),
            Slot::Ref(_) | Slot::Out(_) => Err(fault(ArgumentFault::WrongWay)),
        }
    }

    /// Borrow the current value of any slot.
    pub fn get<T: Any>(&self, index: usize) -> Result<&T, MethodError> {
        let fault = |reason| MethodError::Argument { index, reason };
        let value = match self.slots.get(index).ok_or(fault(ArgumentFault::OutOfRange))? {
            Slot::Val(value) => value.as_ref().ok_or(fault(ArgumentFault::AlreadyTaken))?,
            Slot::Ref(value) => value,
            Slot::Out(value) => value.as_ref().ok_or(fault(ArgumentFault::Unassigned))?,
        };
        value.downcast_ref::<T>().ok_or(fault(ArgumentFault::WrongType {
            expected: std::any::type_name::<T>(),
        }))
    }

    /// Mutably borrow the current value of any slot.
    pub fn get_mut<T: Any>(&mut self, index: usize) -> Result<&mut T, MethodError> {
        let fault = |reason| MethodError::Argument { index, reason };
        let value = match self
            .slots
            .get_mut(index)
            .ok_or(fault(ArgumentFault::OutOfRange))?
        {
            Slot::Val(value) => value.as_mut().ok_or(fault(ArgumentFault::AlreadyTaken))?,
            Slot::Ref(value) => value,
            Slot::Out(value) => value.as_mut().ok_or(fault(ArgumentFault::Unassigned))?,
        };
        value.downcast_mut::<T>().ok_or(fault(ArgumentFault::WrongType {
            expected: std::any::type_name::<T>(),
        }))
    }

    /// Assign a `Ref` or `Out` parameter.
    pub fn set<T: Any + Send>(&mut self, index: usize, value: T) -> Result<(), MethodError> {
        let fault = |reason| MethodError::Argument { index, reason };
        match self
            .slots
            .get_mut(index)
            .ok_or(fault(ArgumentFault::OutOfRange))?
        {
            Slot::Val(_) => Err(fault(ArgumentFault::WrongWay)),
            Slot::Ref(slot) => {
                *slot = Box::new(value);
                Ok(())
            }
            Slot::Out(slot) => {
                *slot = Some(Box::new(value));
                Ok(())
            }
        }
    }

    /// Post-call values of the `Ref` and `Out` slots, in declaration order.
    pub(crate) fn into_response(self) -> Result<Vec<Value>, InvokeError> {
        let mut response = Vec::new();
        for (index, slot) in self.slots.into_iter().enumerate() {
            match slot {
                Slot::Val(_) => {}
                Slot::Ref(value) => response.push(value),
                Slot::Out(Some(value)) => response.push(value),
                Slot::Out(None) => return Err(InvokeError::OutNotAssigned { index }),
            }
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> Arguments {
        let mut args = Arguments::with_capacity(3, Arc::from(Vec::new()));
        args.push_val(Box::new(3i32));
        args.push_ref(Box::new(10i32));
        args.push_out();
        args
    }

    #[test]
    fn take_val_once() {
        let mut args = args();
        assert_eq!(args.take::<i32>(0).unwrap(), 3);
        assert!(matches!(
            args.take::<i32>(0),
            Err(MethodError::Argument {
                index: 0,
                reason: ArgumentFault::AlreadyTaken
            })
        ));
    }

    #[test]
    fn take_wrong_type_keeps_value() {
        let mut args = args();
        assert!(matches!(
            args.take::<String>(0),
            Err(MethodError::Argument {
                reason: ArgumentFault::WrongType { .. },
                ..
            })
        ));
        assert_eq!(args.take::<i32>(0).unwrap(), 3);
    }

    #[test]
    fn ref_updates_in_place() {
        let mut args = args();
        *args.get_mut::<i32>(1).unwrap() += 1;
        assert_eq!(*args.get::<i32>(1).unwrap(), 11);
        assert!(matches!(
            args.take::<i32>(1),
            Err(MethodError::Argument {
                reason: ArgumentFault::WrongWay,
                ..
            })
        ));
    }

    #[test]
    fn out_must_be_assigned() {
        let mut slots = args();
        assert!(matches!(
            slots.get::<i32>(2),
            Err(MethodError::Argument {
                reason: ArgumentFault::Unassigned,
                ..
            })
        ));

        let err = args().into_response().unwrap_err();
        assert!(matches!(err, InvokeError::OutNotAssigned { index: 2 }));

        slots.set(2, 5i32).unwrap();
        let response = slots.into_response().unwrap();
        assert_eq!(response.len(), 2);
        assert_eq!(*response[0].downcast_ref::<i32>().unwrap(), 10);
        assert_eq!(*response[1].downcast_ref::<i32>().unwrap(), 5);
    }

    #[test]
    fn val_cannot_be_assigned() {
        let mut args = args();
        assert!(matches!(
            args.set(0, 1i32),
            Err(MethodError::Argument {
                reason: ArgumentFault::WrongWay,
                ..
            })
        ));
        assert!(matches!(
            args.get::<i32>(7),
            Err(MethodError::Argument {
                index: 7,
                reason: ArgumentFault::OutOfRange
            })
        ));
    }

    #[test]
    fn ways_and_generics() {
        let mut args = Arguments::with_capacity(0, Arc::from(vec![TypeDesc::named("i32")]));
        assert!(args.is_empty());
        args.push_out();
        assert_eq!(args.way(0), Some(ParameterWay::Out));
        assert_eq!(args.way(1), None);
        assert_eq!(args.generic_arguments(), &[TypeDesc::named("i32")]);
    }
}
