use std::ops::{Deref, DerefMut};

use crate::network::device::Device;
use crate::network::model::MultimodalModel;

/// Disables gradient tracking on a model until dropped. The previous flag is
/// restored on every exit path, unwinding included.
pub struct NoGrad<'a, M: MultimodalModel + ?Sized> {
    model: &'a mut M,
    previous: bool,
}

impl<'a, M: MultimodalModel + ?Sized> NoGrad<'a, M> {
    pub fn new(model: &'a mut M) -> Self {
        let previous = model.grad_enabled();
        model.set_grad_enabled(false);
        NoGrad { model, previous }
    }
}

impl<M: MultimodalModel + ?Sized> Deref for NoGrad<'_, M> {
    type Target = M;

    fn deref(&self) -> &M {
        self.model
    }
}

impl<M: MultimodalModel + ?Sized> DerefMut for NoGrad<'_, M> {
    fn deref_mut(&mut self) -> &mut M {
        self.model
    }
}

impl<M: MultimodalModel + ?Sized> Drop for NoGrad<'_, M> {
    fn drop(&mut self) {
        self.model.set_grad_enabled(self.previous);
    }
}

/// Moves a model to `target` until dropped, then back to where it was.
pub struct Placement<'a, M: MultimodalModel + ?Sized> {
    model: &'a mut M,
    previous: Device,
}

impl<'a, M: MultimodalModel + ?Sized> Placement<'a, M> {
    pub fn new(model: &'a mut M, target: Device) -> Self {
        let previous = model.device();
        if previous != target {
            model.to_device(target);
        }
        Placement { model, previous }
    }
}

impl<M: MultimodalModel + ?Sized> Deref for Placement<'_, M> {
    type Target = M;

    fn deref(&self) -> &M {
        self.model
    }
}

impl<M: MultimodalModel + ?Sized> DerefMut for Placement<'_, M> {
    fn deref_mut(&mut self) -> &mut M {
        self.model
    }
}

impl<M: MultimodalModel + ?Sized> Drop for Placement<'_, M> {
    fn drop(&mut self) {
        if self.model.device() != self.previous {
            self.model.to_device(self.previous);
        }
    }
}
