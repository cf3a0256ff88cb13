//! Property-based test generators using proptest.
//!
//! Provides strategies for logical paths and write workloads that keep the
//! invariants the VFS expects of its inputs.

use proptest::prelude::*;

/// Strategy for generating bucket names.
pub fn bucket_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9-]{1,15}").expect("Invalid regex")
}

/// Strategy for generating a single key segment.
///
/// Segments never end in a side-file suffix, so the last segment always
/// names a main database.
pub fn key_segment_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9_][a-zA-Z0-9_.]{0,11}")
        .expect("Invalid regex")
        .prop_filter("segment must not be a dot path", |s| s != "." && s != "..")
}

/// Strategy for generating object keys of one to four segments.
pub fn key_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(key_segment_strategy(), 1..=4)
}

/// Strategy for generating a logical path with its expected bucket and key.
pub fn logical_path_strategy() -> impl Strategy<Value = (String, String, String)> {
    (bucket_strategy(), key_strategy()).prop_map(|(bucket, segments)| {
        let key = segments.join("/");
        (format!("{bucket}/{key}"), bucket, key)
    })
}

/// A positioned write against a file handle.
#[derive(Debug, Clone)]
pub struct WriteOp {
    /// Byte offset of the write.
    pub offset: u64,
    /// Bytes to write.
    pub data: Vec<u8>,
}

/// Strategy for generating a single write within the first `max_offset`
/// bytes.
pub fn write_op_strategy(max_offset: u64) -> impl Strategy<Value = WriteOp> {
    (0..max_offset, prop::collection::vec(any::<u8>(), 1..256))
        .prop_map(|(offset, data)| WriteOp { offset, data })
}

/// Strategy for generating a sequence of writes.
pub fn write_ops_strategy(max_ops: usize) -> impl Strategy<Value = Vec<WriteOp>> {
    prop::collection::vec(write_op_strategy(8192), 1..=max_ops)
}

/// Applies writes to an in-memory model of the file contents.
///
/// Gaps between the old end and a write offset are zero-filled, as with a
/// sparse local file.
pub fn apply_to_model(model: &mut Vec<u8>, ops: &[WriteOp]) {
    for op in ops {
        let start = op.offset as usize;
        let end = start + op.data.len();
        if model.len() < end {
            model.resize(end, 0);
        }
        model[start..end].copy_from_slice(&op.data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn logical_paths_have_two_segments((path, bucket, key) in logical_path_strategy()) {
            prop_assert!(path.split('/').count() >= 2);
            prop_assert_eq!(path, format!("{bucket}/{key}"));
        }
    }

    #[test]
    fn model_zero_fills_gaps() {
        let mut model = Vec::new();
        apply_to_model(
            &mut model,
            &[WriteOp {
                offset: 4,
                data: vec![1, 2],
            }],
        );
        assert_eq!(model, vec![0, 0, 0, 0, 1, 2]);
    }
}
