//! In-memory record store and its plaintext format.
//!
//! The plaintext buffer holds one record per line:
//!
//! ```text
//! <URL>\t<USERNAME>\t<PASSWORD>\t\n
//! ```
//!
//! Splitting a line on tab therefore yields exactly four fields, the last
//! one empty. Empty lines are skipped. An empty store serializes to an
//! empty buffer.

use zeroize::{Zeroize, Zeroizing};

use super::record::{Credential, CredentialId};
use crate::errors::{PwStoreError, Result};

/// Field delimiter of the plaintext format.
const DELIM: char = '\t';

/// Fields per line, including the empty one after the trailing delimiter.
const FIELDS_PER_LINE: usize = 4;

/// Ordered collection of credentials, always sorted by `Credential`'s
/// total order.
///
/// `dirty` tracks whether `records` differs from `buffer`, the last
/// materialized plaintext.
#[derive(Default)]
pub struct RecordStore {
    records: Vec<Credential>,
    buffer: Zeroizing<String>,
    dirty: bool,
    line_count: usize,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a plaintext buffer.
    pub fn from_buffer(buffer: &str) -> Result<Self> {
        let mut store = Self::new();
        store.parse(buffer)?;
        Ok(store)
    }

    /// Replace the contents of the store with the records in `buffer`.
    ///
    /// The store is cleared first. Parsing is not atomic: on a corrupt
    /// line the records inserted from earlier lines stay in the store and
    /// the store is left dirty.
    pub fn parse(&mut self, buffer: &str) -> Result<()> {
        self.clear();

        for (index, line) in buffer.split('\n').enumerate() {
            if line.is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split(DELIM).collect();
            if fields.len() != FIELDS_PER_LINE {
                self.dirty = true;
                tracing::warn!(
                    line = index + 1,
                    fields = fields.len(),
                    "corrupt record line"
                );
                return Err(PwStoreError::CorruptFormat {
                    line: index + 1,
                    fields: fields.len(),
                });
            }

            self.insert(Credential::new(fields[0], fields[1], fields[2]));
            self.line_count += 1;
        }

        self.buffer = Zeroizing::new(buffer.to_owned());
        self.dirty = false;
        tracing::debug!(records = self.line_count, "parsed record buffer");
        Ok(())
    }

    /// Insert a record at its sorted position and return its id.
    ///
    /// Duplicates are allowed. The returned id is only valid until the
    /// next mutation.
    pub fn insert(&mut self, record: Credential) -> CredentialId {
        let id = self.records.partition_point(|existing| existing <= &record);
        self.records.insert(id, record);
        self.dirty = true;
        id
    }

    /// All records whose url or username contains `key`, in store order.
    ///
    /// An empty key matches every record.
    pub fn lookup(&self, key: &str) -> Vec<(CredentialId, &Credential)> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, record)| record.matches(key))
            .collect()
    }

    pub fn get(&self, id: CredentialId) -> Option<&Credential> {
        self.records.get(id)
    }

    /// Remove every record named in `ids`.
    ///
    /// Fails without touching the store if `ids` is empty, the store is
    /// empty, or any id is out of range. Repeated ids count once. Records
    /// are removed from the highest id down so the remaining ids stay
    /// valid during the removal.
    pub fn remove(&mut self, ids: &[CredentialId]) -> Result<()> {
        let Some(&first) = ids.first() else {
            return Err(PwStoreError::EmptyOperation("no ids given to remove".into()));
        };
        if self.records.is_empty() {
            return Err(PwStoreError::InvalidId(first));
        }
        if let Some(&bad) = ids.iter().find(|&&id| id >= self.records.len()) {
            return Err(PwStoreError::InvalidId(bad));
        }

        let mut ordered = ids.to_vec();
        ordered.sort_unstable_by(|a, b| b.cmp(a));
        ordered.dedup();

        for id in ordered {
            // Dropping the record zeroes its fields.
            drop(self.records.remove(id));
        }
        self.dirty = true;
        Ok(())
    }

    /// Render the records into the plaintext buffer and return it.
    ///
    /// A clean store returns the last materialized buffer unchanged.
    pub fn serialize(&mut self) -> &str {
        if self.dirty {
            let capacity = self
                .records
                .iter()
                .map(|r| r.url.len() + r.username.len() + r.password.len() + 4)
                .sum();
            let mut rendered = Zeroizing::new(String::with_capacity(capacity));
            for record in &self.records {
                rendered.push_str(&record.url);
                rendered.push(DELIM);
                rendered.push_str(&record.username);
                rendered.push(DELIM);
                rendered.push_str(&record.password);
                rendered.push(DELIM);
                rendered.push('\n');
            }
            self.buffer = rendered;
            self.dirty = false;
        }
        &self.buffer
    }

    /// Zero every record field and the plaintext buffer, then empty the
    /// store.
    pub fn clear(&mut self) {
        for record in &mut self.records {
            record.zeroize();
        }
        self.records.clear();
        self.buffer.zeroize();
        self.dirty = false;
        self.line_count = 0;
    }

    /// Every record with its current id, in store order.
    pub fn dump(&self) -> Vec<(CredentialId, &Credential)> {
        self.records.iter().enumerate().collect()
    }

    pub fn records(&self) -> &[Credential] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of records read by the last `parse`.
    pub fn line_count(&self) -> usize {
        self.line_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RecordStore {
        let mut store = RecordStore::new();
        store.insert(Credential::new("ebay.de", "ebay_user1", "password1"));
        store.insert(Credential::new("ebay", "ebay_user2", "password2"));
        store.insert(Credential::new("amazon.de", "amazon_user", "password3"));
        store
    }

    fn urls(store: &RecordStore) -> Vec<&str> {
        store.records().iter().map(|r| r.url.as_str()).collect()
    }

    #[test]
    fn insert_keeps_sorted_order() {
        let store = sample();
        assert_eq!(urls(&store), vec!["amazon.de", "ebay", "ebay.de"]);
        assert!(store.records().windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn insert_returns_sorted_position() {
        let mut store = sample();
        let id = store.insert(Credential::new("b", "", ""));
        assert_eq!(id, 1);
        assert_eq!(store.get(id).unwrap().url, "b");
    }

    #[test]
    fn duplicates_are_allowed() {
        let mut store = RecordStore::new();
        store.insert(Credential::new("a", "b", "c"));
        store.insert(Credential::new("a", "b", "c"));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn insert_marks_dirty() {
        let mut store = RecordStore::new();
        assert!(!store.is_dirty());
        store.insert(Credential::new("a", "b", "c"));
        assert!(store.is_dirty());
    }

    #[test]
    fn serialize_format() {
        let mut store = RecordStore::new();
        store.insert(Credential::new("b.com", "bob", "pw2"));
        store.insert(Credential::new("a.com", "alice", "pw1"));
        assert_eq!(
            store.serialize(),
            "a.com\talice\tpw1\t\nb.com\tbob\tpw2\t\n"
        );
        assert!(!store.is_dirty());
    }

    #[test]
    fn empty_store_serializes_to_empty_buffer() {
        let mut store = RecordStore::new();
        assert_eq!(store.serialize(), "");
    }

    #[test]
    fn parse_serialize_roundtrip() {
        let mut store = sample();
        let buffer = store.serialize().to_owned();

        let mut reparsed = RecordStore::from_buffer(&buffer).unwrap();
        assert_eq!(reparsed.records(), store.records());
        assert!(!reparsed.is_dirty());
        assert_eq!(reparsed.serialize(), buffer);
    }

    #[test]
    fn parse_skips_empty_lines_and_allows_empty_fields() {
        let store = RecordStore::from_buffer("\n\t\t\t\n\nx\t\tpw\t\n").unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.line_count(), 2);
        assert_eq!(store.get(0).unwrap(), &Credential::new("", "", ""));
        assert_eq!(store.get(1).unwrap(), &Credential::new("x", "", "pw"));
    }

    #[test]
    fn parse_rejects_wrong_field_count() {
        let err = RecordStore::from_buffer("a\tb\tc\n").err().unwrap();
        assert!(matches!(
            err,
            PwStoreError::CorruptFormat { line: 1, fields: 3 }
        ));

        let err = RecordStore::from_buffer("a\tb\tc\td\te\n").err().unwrap();
        assert!(matches!(err, PwStoreError::CorruptFormat { fields: 5, .. }));
    }

    #[test]
    fn parse_keeps_records_before_corrupt_line() {
        let mut store = RecordStore::new();
        let result = store.parse("a\tb\tc\t\nbroken\nz\ty\tx\t\n");
        assert!(matches!(
            result,
            Err(PwStoreError::CorruptFormat { line: 2, .. })
        ));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(0).unwrap().url, "a");
    }

    #[test]
    fn parse_clears_previous_contents() {
        let mut store = sample();
        store.parse("only\tone\tpw\t\n").unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn lookup_matches_url_or_username_in_store_order() {
        let store = sample();
        let matches = store.lookup("ebay");
        let ids: Vec<CredentialId> = matches.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(matches[0].1.url, "ebay");
        assert_eq!(matches[1].1.url, "ebay.de");

        assert_eq!(store.lookup("amazon_user").len(), 1);
        assert!(store.lookup("EBAY").is_empty());
    }

    #[test]
    fn empty_lookup_returns_everything() {
        assert_eq!(sample().lookup("").len(), 3);
    }

    #[test]
    fn get_is_bounds_checked() {
        let store = sample();
        assert_eq!(store.get(0).unwrap().url, "amazon.de");
        assert!(store.get(3).is_none());
    }

    #[test]
    fn remove_empty_id_list_fails() {
        let mut store = sample();
        assert!(matches!(
            store.remove(&[]),
            Err(PwStoreError::EmptyOperation(_))
        ));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn remove_out_of_range_fails_without_mutation() {
        let mut store = sample();
        let before = store.serialize().to_owned();
        assert!(matches!(store.remove(&[0, 3]), Err(PwStoreError::InvalidId(3))));
        assert_eq!(store.len(), 3);
        assert!(!store.is_dirty());
        assert_eq!(store.serialize(), before);
    }

    #[test]
    fn remove_from_empty_store_fails() {
        let mut store = RecordStore::new();
        assert!(matches!(store.remove(&[0]), Err(PwStoreError::InvalidId(0))));
    }

    #[test]
    fn remove_multiple_ids_in_any_order() {
        let mut store = sample();
        store.remove(&[2, 0]).unwrap();
        assert_eq!(urls(&store), vec!["ebay"]);
        assert!(store.is_dirty());
    }

    #[test]
    fn remove_repeated_id_counts_once() {
        let mut store = sample();
        store.remove(&[1, 1]).unwrap();
        assert_eq!(urls(&store), vec!["amazon.de", "ebay.de"]);
    }

    #[test]
    fn clear_empties_store_and_buffer() {
        let mut store = sample();
        store.serialize();
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.serialize(), "");
    }

    #[test]
    fn dump_pairs_ids_with_records() {
        let store = sample();
        let dump = store.dump();
        assert_eq!(dump.len(), 3);
        for (expected, (id, record)) in dump.iter().enumerate() {
            assert_eq!(*id, expected);
            assert_eq!(store.get(*id), Some(*record));
        }
    }
}
