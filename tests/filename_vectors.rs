//! Filename metadata vector validation
//!
//! Table-driven checks that stored names split back into the expected
//! extension, type descriptor and container name.

use serde::Deserialize;

use strongbox::metadata;

#[derive(Debug, Deserialize)]
struct FilenameVector {
    name: String,
    extension: String,
    mime: String,
    container_name: String,
    comment: String,
}

fn load_vectors() -> Vec<FilenameVector> {
    let json_data = include_str!("../testdata/filename-vectors.json");
    serde_json::from_str(json_data).expect("failed to load filename vectors")
}

#[test]
fn test_filename_vectors() {
    let vectors = load_vectors();
    assert!(!vectors.is_empty());

    for vector in &vectors {
        let stored = metadata::encode(&vector.name);
        assert_eq!(stored, vector.name, "encode must be identity: {}", vector.comment);

        let decoded = metadata::decode(stored);
        assert_eq!(
            decoded.suggested_name, vector.name,
            "suggested name must round-trip: {}",
            vector.comment
        );
        assert_eq!(
            decoded.extension, vector.extension,
            "extension mismatch: {}",
            vector.comment
        );

        let descriptor = metadata::resolve_type_descriptor(&decoded.extension);
        assert_eq!(descriptor.mime(), vector.mime, "mime mismatch: {}", vector.comment);

        assert_eq!(
            metadata::container_name(&vector.name),
            vector.container_name,
            "container name mismatch: {}",
            vector.comment
        );
    }
}
