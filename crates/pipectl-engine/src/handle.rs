//! Opaque engine handles.
//!
//! Handles are move-only. Every release call on [`crate::RenderEngine`]
//! consumes the handle it releases, so a handle cannot be released twice.

macro_rules! engine_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, PartialEq, Eq, Hash)]
        pub struct $name(u64);

        impl $name {
            /// Wrap a raw engine object id.
            pub fn from_raw(id: u64) -> Self {
                Self(id)
            }

            /// Raw engine object id.
            pub fn raw(&self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

engine_handle!(
    /// A scene, the composition root.
    SceneHandle
);
engine_handle!(
    /// A source not yet placed in a scene.
    SourceHandle
);
engine_handle!(
    /// A source's placement inside a scene.
    SceneItemHandle
);
engine_handle!(
    /// A video or audio encoder.
    EncoderHandle
);
engine_handle!(
    /// An output sink.
    OutputHandle
);
engine_handle!(
    /// A streaming service bound to an output.
    ServiceHandle
);
