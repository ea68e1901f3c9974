#![forbid(unsafe_code)]

//! Foreign dispatch registration hook.
//!
//! # Role in glkrt
//! A reflection or garbage-collection layer sitting above the runtime (for
//! example a VM dispatcher that maps objects to its own handles) can install
//! a [`DispatchHook`]. The runtime then announces every window, stream and
//! fileref as it is created and destroyed, and every character array it holds
//! on the caller's behalf (memory-stream buffers, line-input buffers).
//!
//! The hook is optional. [`Dispatch`] wraps the `Option` so call sites never
//! branch on whether one is installed.

use std::fmt;

use crate::id::{FilerefId, StreamId, WindowId};

/// Type code announced for 8-bit arrays.
pub const LATIN1_ARRAY_TYPECODE: &str = "&+#!Cn";

/// Type code announced for 32-bit arrays.
pub const UNICODE_ARRAY_TYPECODE: &str = "&+#!Iu";

/// Opaque value returned by the hook on registration and handed back on
/// unregistration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DispatchRock(pub u64);

/// Class tag of a registered object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectClass {
    Window,
    Stream,
    Fileref,
}

impl ObjectClass {
    /// Numeric class tag used by dispatch layers (window 0, stream 1, fileref 2).
    #[must_use]
    pub const fn as_raw(self) -> u32 {
        match self {
            Self::Window => 0,
            Self::Stream => 1,
            Self::Fileref => 2,
        }
    }
}

/// A registered object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectRef {
    Window(WindowId),
    Stream(StreamId),
    Fileref(FilerefId),
}

impl ObjectRef {
    #[must_use]
    pub const fn class(self) -> ObjectClass {
        match self {
            Self::Window(_) => ObjectClass::Window,
            Self::Stream(_) => ObjectClass::Stream,
            Self::Fileref(_) => ObjectClass::Fileref,
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Window(id) => fmt::Display::fmt(id, f),
            Self::Stream(id) => fmt::Display::fmt(id, f),
            Self::Fileref(id) => fmt::Display::fmt(id, f),
        }
    }
}

/// Who holds a registered array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayOwner {
    /// Backing buffer of a memory stream.
    MemoryStream(StreamId),
    /// Buffer bound to an outstanding line-input request.
    LineInput(WindowId),
}

/// A character array held by the runtime on the caller's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArrayRef {
    pub owner: ArrayOwner,
    pub len: usize,
    pub unicode: bool,
}

impl ArrayRef {
    #[must_use]
    pub const fn type_code(&self) -> &'static str {
        if self.unicode {
            UNICODE_ARRAY_TYPECODE
        } else {
            LATIN1_ARRAY_TYPECODE
        }
    }
}

/// Callbacks invoked around object and array lifetimes.
pub trait DispatchHook: Send {
    /// An object was created (or existed when the hook was installed).
    fn register(&mut self, object: ObjectRef) -> DispatchRock;

    /// An object is about to be destroyed.
    fn unregister(&mut self, object: ObjectRef, rock: DispatchRock);

    /// An array became bound to the runtime.
    fn register_array(&mut self, array: ArrayRef) -> DispatchRock;

    /// An array is about to be released back to the caller.
    fn unregister_array(&mut self, array: ArrayRef, rock: DispatchRock);
}

/// Optional installed hook.
#[derive(Default)]
pub struct Dispatch {
    hook: Option<Box<dyn DispatchHook>>,
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch")
            .field("installed", &self.hook.is_some())
            .finish()
    }
}

impl Dispatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.hook.is_some()
    }

    /// Install a hook, replacing any previous one.
    pub fn install(&mut self, hook: Box<dyn DispatchHook>) {
        tracing::debug!(target: "glkrt.dispatch", "dispatch hook installed");
        self.hook = Some(hook);
    }

    /// Remove the installed hook, returning it.
    pub fn clear(&mut self) -> Option<Box<dyn DispatchHook>> {
        tracing::debug!(target: "glkrt.dispatch", "dispatch hook cleared");
        self.hook.take()
    }

    /// Announce an object. Returns `None` when no hook is installed.
    pub fn register(&mut self, object: ObjectRef) -> Option<DispatchRock> {
        let hook = self.hook.as_mut()?;
        let rock = hook.register(object);
        tracing::trace!(target: "glkrt.dispatch", %object, rock = rock.0, "register");
        Some(rock)
    }

    /// Retract an object. Objects registered before the hook existed carry no
    /// rock and are retracted with the default one.
    pub fn unregister(&mut self, object: ObjectRef, rock: Option<DispatchRock>) {
        if let Some(hook) = self.hook.as_mut() {
            tracing::trace!(target: "glkrt.dispatch", %object, "unregister");
            hook.unregister(object, rock.unwrap_or_default());
        }
    }

    pub fn register_array(&mut self, array: ArrayRef) -> Option<DispatchRock> {
        let hook = self.hook.as_mut()?;
        let rock = hook.register_array(array);
        tracing::trace!(
            target: "glkrt.dispatch",
            owner = ?array.owner,
            len = array.len,
            typecode = array.type_code(),
            "register array"
        );
        Some(rock)
    }

    pub fn unregister_array(&mut self, array: ArrayRef, rock: Option<DispatchRock>) {
        if let Some(hook) = self.hook.as_mut() {
            tracing::trace!(target: "glkrt.dispatch", owner = ?array.owner, "unregister array");
            hook.unregister_array(array, rock.unwrap_or_default());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Log(Arc<Mutex<Vec<String>>>);

    struct Recorder {
        log: Log,
        next: u64,
    }

    impl DispatchHook for Recorder {
        fn register(&mut self, object: ObjectRef) -> DispatchRock {
            self.next += 1;
            self.log.0.lock().expect("log").push(format!("+{object}"));
            DispatchRock(self.next)
        }

        fn unregister(&mut self, object: ObjectRef, rock: DispatchRock) {
            self.log
                .0
                .lock()
                .expect("log")
                .push(format!("-{object}@{}", rock.0));
        }

        fn register_array(&mut self, array: ArrayRef) -> DispatchRock {
            self.log
                .0
                .lock()
                .expect("log")
                .push(format!("+array {} {}", array.len, array.type_code()));
            DispatchRock(99)
        }

        fn unregister_array(&mut self, array: ArrayRef, rock: DispatchRock) {
            self.log
                .0
                .lock()
                .expect("log")
                .push(format!("-array {} @{}", array.len, rock.0));
        }
    }

    #[test]
    fn without_hook_everything_is_silent() {
        let mut dispatch = Dispatch::new();
        let win = WindowId::new(1).expect("id");
        assert!(dispatch.register(ObjectRef::Window(win)).is_none());
        dispatch.unregister(ObjectRef::Window(win), None);
        assert!(!dispatch.is_installed());
    }

    #[test]
    fn installed_hook_sees_objects_and_arrays() {
        let log = Log::default();
        let mut dispatch = Dispatch::new();
        dispatch.install(Box::new(Recorder {
            log: log.clone(),
            next: 0,
        }));
        let win = WindowId::new(2).expect("id");
        let rock = dispatch.register(ObjectRef::Window(win));
        assert_eq!(rock, Some(DispatchRock(1)));

        let array = ArrayRef {
            owner: ArrayOwner::LineInput(win),
            len: 16,
            unicode: true,
        };
        let array_rock = dispatch.register_array(array);
        dispatch.unregister_array(array, array_rock);
        dispatch.unregister(ObjectRef::Window(win), rock);

        let seen = log.0.lock().expect("log").clone();
        assert_eq!(
            seen,
            vec![
                "+window#2".to_owned(),
                "+array 16 &+#!Iu".to_owned(),
                "-array 16 @99".to_owned(),
                "-window#2@1".to_owned(),
            ]
        );
    }

    #[test]
    fn class_tags_are_stable() {
        let stream = ObjectRef::Stream(StreamId::new(1).expect("id"));
        assert_eq!(stream.class(), ObjectClass::Stream);
        assert_eq!(ObjectClass::Fileref.as_raw(), 2);
    }

    #[test]
    fn latin1_arrays_use_byte_typecode() {
        let array = ArrayRef {
            owner: ArrayOwner::MemoryStream(StreamId::new(5).expect("id")),
            len: 4,
            unicode: false,
        };
        assert_eq!(array.type_code(), "&+#!Cn");
    }
}
