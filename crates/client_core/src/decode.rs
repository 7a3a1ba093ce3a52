use shared::domain::Record;

/// Decodes the engine's `getAll` stdout into an ordered listing.
///
/// Rules, inherited from the observed engine output format:
/// - lines without a `:` separating a non-empty key from non-empty value
///   text are non-data (banners like `All Key-Value Pairs:` and status
///   lines like `Data retrieved successfully`) and are skipped;
/// - only the first colon on a line delimits key from value, so values may
///   contain further colons;
/// - both sides are trimmed;
/// - the first parsed element is dropped unconditionally. The drop assumes
///   one introductory data-shaped line ahead of the real records; when the
///   engine instead emits a bare trailing-colon banner, the first real
///   record is silently lost. That loss is part of the observed contract
///   and is reproduced here rather than fixed (the engine is external and
///   its output format cannot be changed from this side).
///
/// Malformed lines are skipped rather than failing the whole listing, and
/// empty input decodes to an empty listing.
pub fn decode_listing(raw: &str) -> Vec<Record> {
    raw.lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            let key = key.trim();
            let value = value.trim();
            if key.is_empty() || value.is_empty() {
                return None;
            }
            Some(Record::new(key, value))
        })
        .skip(1)
        .collect()
}
