fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use blockput_protocol::{BlockProgress, BlockState, ChunkReply, CommitReply, ErrorReply};

    const BLOCK_SIZE: u64 = 4 * 1024 * 1024;

    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Deserializes a fixture, re-serializes it, and compares the JSON
    /// values (key order independent).
    fn roundtrip_test<T>(name: &str) -> T
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));

        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  fixture: {fixture}\n  rust:    {reserialized}"
        );
        parsed
    }

    // --- Persisted progress ---

    #[test]
    fn fixture_block_progress() {
        let progress: Vec<BlockProgress> = roundtrip_test("block_progress.json");
        assert_eq!(progress.len(), 3);

        assert_eq!(progress[0].state(BLOCK_SIZE), BlockState::Complete);
        assert_eq!(progress[0].crc32, 4_027_385_292);
        assert_eq!(progress[1].state(BLOCK_SIZE), BlockState::InProgress);
        assert_eq!(progress[2].state(BLOCK_SIZE), BlockState::Fresh);
        assert!(progress[2].error.as_deref().unwrap().starts_with("block 2:"));
    }

    #[test]
    fn block_progress_without_optional_fields() {
        let v = serde_json::json!({ "ctx": "c", "offset": 8, "crc32": 1 });
        let p: BlockProgress = serde_json::from_value(v.clone()).unwrap();
        assert!(p.checksum.is_empty());
        assert!(p.error.is_none());
        assert_eq!(serde_json::to_value(&p).unwrap(), v);
    }

    // --- Service replies ---

    #[test]
    fn fixture_chunk_reply() {
        let reply: ChunkReply = roundtrip_test("chunk_reply.json");
        assert_eq!(reply.offset, 262_144);
        assert!(!reply.ctx.is_empty());
    }

    #[test]
    fn chunk_reply_then_progress() {
        let reply: ChunkReply = roundtrip_test("chunk_reply.json");
        let mut p = BlockProgress::default();
        p.accept(&reply, reply.offset);

        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["ctx"], serde_json::json!(reply.ctx));
        assert_eq!(v["offset"], serde_json::json!(262_144));
        assert_eq!(v["crc32"], serde_json::json!(reply.crc32));
        assert!(v.get("error").is_none());
    }

    #[test]
    fn fixture_commit_reply() {
        let reply: CommitReply = roundtrip_test("commit_reply.json");
        assert_eq!(reply.key, "photos/2024/01.jpg");
    }

    #[test]
    fn fixture_error_reply() {
        let reply: ErrorReply = roundtrip_test("error_reply.json");
        assert_eq!(reply.error, "invalid context");
    }
}
