/// Implement [`From`] conversions into an error type.
///
/// ```ignore
/// impl_from! { for StoreError ;
///     std::io::Error => |e| StoreError::Io(e),
/// }
/// ```
macro_rules! impl_from {
    { for $type:ty ;
        $(
            $from:ty => | $pat:pat | $value:expr
        ),+
        $(,)*
    } => {
        $(
            impl From<$from> for $type {
                fn from(f: $from) -> $type {
                    let $pat = f;
                    $value
                }
            }
        )+
    };
}
