// Trait-based interfaces between peripheral models and the code driving them

use std::sync::{Arc, Mutex, PoisonError};

use crate::can::{CanFrame, CanNode};

/// Offset-addressed register block of one peripheral.
///
/// Accesses are 32 bits wide. `read` takes `&mut self` because some
/// registers clear flags when read.
pub trait RegisterFile: Send {
    fn read(&mut self, offset: u32) -> u32;
    fn write(&mut self, offset: u32, value: u32);
}

/// A shared peripheral: every access takes the lock for its duration.
impl<T: RegisterFile + ?Sized> RegisterFile for Arc<Mutex<T>> {
    fn read(&mut self, offset: u32) -> u32 {
        self.lock().unwrap_or_else(PoisonError::into_inner).read(offset)
    }

    fn write(&mut self, offset: u32, value: u32) {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write(offset, value)
    }
}

impl<T: RegisterFile + ?Sized> RegisterFile for Box<T> {
    fn read(&mut self, offset: u32) -> u32 {
        (**self).read(offset)
    }

    fn write(&mut self, offset: u32, value: u32) {
        (**self).write(offset, value)
    }
}

/// Level-triggered interrupt request line towards the processor.
pub trait IrqLine: Send + Sync {
    fn set_level(&self, level: bool);

    fn raise(&self) {
        self.set_level(true);
    }

    fn lower(&self) {
        self.set_level(false);
    }
}

/// Destination of bytes shifted out by a serial transmitter.
pub trait ByteSink: Send {
    fn write_byte(&mut self, byte: u8);
}

impl ByteSink for Vec<u8> {
    fn write_byte(&mut self, byte: u8) {
        self.push(byte);
    }
}

/// Capability invoked synchronously when a frame lands in a node's queue.
///
/// Called after the node's queue lock has been released.
pub trait FrameSink: Send + Sync {
    fn deliver(&self, node: &CanNode, frame: &CanFrame);
}

impl<F> FrameSink for F
where
    F: Fn(&CanNode, &CanFrame) + Send + Sync,
{
    fn deliver(&self, node: &CanNode, frame: &CanFrame) {
        self(node, frame)
    }
}

/// Several sinks behind one node, called in insertion order.
#[derive(Default, Clone)]
pub struct SinkSet(pub Vec<Arc<dyn FrameSink>>);

impl FrameSink for SinkSet {
    fn deliver(&self, node: &CanNode, frame: &CanFrame) {
        for sink in &self.0 {
            sink.deliver(node, frame);
        }
    }
}
