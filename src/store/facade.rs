//! `PasswordStore` — the single entry point for every caller.
//!
//! The facade remembers whether the underlying `EncryptedStore` could be
//! opened and answers `NotUsable` from every operation when it could
//! not. It does not check for the locked state itself; the record
//! operations report `Locked` when there is nothing to operate on, and
//! interactive callers are expected to check `is_locked` first.

use chrono::{DateTime, Utc};
use zeroize::Zeroizing;

use super::encrypted::EncryptedStore;
use super::file::{CipherFile, SealedFile};
use super::record::{Credential, CredentialId};
use crate::crypto::random::{self, DEFAULT_PASSWORD_LEN};
use crate::errors::{PwStoreError, Result};

pub struct PasswordStore<F: CipherFile = SealedFile> {
    inner: Option<EncryptedStore<F>>,

    /// Why `inner` is missing.
    open_error: Option<String>,
}

impl<F: CipherFile> PasswordStore<F> {
    /// Open `file` and keep the outcome. Never fails; check `is_usable`.
    pub fn connect(file: F, password: &str) -> Self {
        match EncryptedStore::open(file, password) {
            Ok(store) => Self {
                inner: Some(store),
                open_error: None,
            },
            Err(e) => {
                tracing::warn!(error = %e, "could not open database");
                Self {
                    inner: None,
                    open_error: Some(e.to_string()),
                }
            }
        }
    }

    /// Open `file`, failing with the underlying cause.
    pub fn open(file: F, password: &str) -> Result<Self> {
        let store = EncryptedStore::open(file, password)?;
        Ok(Self {
            inner: Some(store),
            open_error: None,
        })
    }

    pub fn is_usable(&self) -> bool {
        self.inner.is_some()
    }

    /// Why the store is not usable, if it is not.
    pub fn open_error(&self) -> Option<&str> {
        self.open_error.as_deref()
    }

    fn usable(&self) -> Result<&EncryptedStore<F>> {
        self.inner.as_ref().ok_or_else(|| self.not_usable())
    }

    fn usable_mut(&mut self) -> Result<&mut EncryptedStore<F>> {
        match self.inner.as_mut() {
            Some(store) => Ok(store),
            None => Err(PwStoreError::NotUsable(
                self.open_error.clone().unwrap_or_default(),
            )),
        }
    }

    fn not_usable(&self) -> PwStoreError {
        PwStoreError::NotUsable(self.open_error.clone().unwrap_or_default())
    }

    // ------------------------------------------------------------------
    // Record operations
    // ------------------------------------------------------------------

    /// Insert a record and return its (transient) id.
    pub fn add(&mut self, record: Credential) -> Result<CredentialId> {
        let store = self.usable_mut()?;
        record.validate()?;
        let id = store.records_mut()?.insert(record);
        tracing::debug!(id, "record added");
        Ok(id)
    }

    /// Records whose url or username contains `key`. Empty key matches all.
    pub fn lookup(&self, key: &str) -> Result<Vec<(CredentialId, Credential)>> {
        Ok(self
            .usable()?
            .records()?
            .lookup(key)
            .into_iter()
            .map(|(id, record)| (id, record.clone()))
            .collect())
    }

    /// Key matches followed by the records at `ids`.
    ///
    /// An empty key contributes no matches. Ids that do not exist are
    /// skipped.
    pub fn lookup_with_ids(
        &self,
        key: &str,
        ids: &[CredentialId],
    ) -> Result<Vec<(CredentialId, Credential)>> {
        let records = self.usable()?.records()?;
        let mut matches: Vec<(CredentialId, Credential)> = Vec::new();
        if !key.is_empty() {
            matches.extend(
                records
                    .lookup(key)
                    .into_iter()
                    .map(|(id, record)| (id, record.clone())),
            );
        }
        for &id in ids {
            if let Some(record) = records.get(id) {
                matches.push((id, record.clone()));
            }
        }
        Ok(matches)
    }

    pub fn get(&self, id: CredentialId) -> Result<Credential> {
        self.usable()?
            .records()?
            .get(id)
            .cloned()
            .ok_or(PwStoreError::InvalidId(id))
    }

    pub fn remove(&mut self, ids: &[CredentialId]) -> Result<()> {
        self.usable_mut()?.records_mut()?.remove(ids)?;
        tracing::debug!(count = ids.len(), "records removed");
        Ok(())
    }

    /// Every record with its id, in store order.
    pub fn dump(&self) -> Result<Vec<(CredentialId, Credential)>> {
        Ok(self
            .usable()?
            .records()?
            .dump()
            .into_iter()
            .map(|(id, record)| (id, record.clone()))
            .collect())
    }

    /// Generate a random password of `DEFAULT_PASSWORD_LEN` symbols.
    ///
    /// `alphabet` defaults to every printable ASCII character. With
    /// `insert`, the password is stored under `url`/`username`; at least
    /// one of them must be non-empty or the record could never be found
    /// again.
    pub fn gen_password(
        &mut self,
        username: &str,
        url: &str,
        insert: bool,
        alphabet: Option<&[u8]>,
    ) -> Result<Zeroizing<String>> {
        self.usable()?;
        if insert && username.is_empty() && url.is_empty() {
            return Err(PwStoreError::EmptyOperation(
                "a generated password needs a url or username to be retrievable".into(),
            ));
        }

        let password = match alphabet {
            Some(symbols) => random::draw(DEFAULT_PASSWORD_LEN, symbols)?,
            None => random::draw(DEFAULT_PASSWORD_LEN, &random::printable_ascii())?,
        };

        if insert {
            self.add(Credential::new(url, username, password.as_str()))?;
        }
        Ok(password)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    pub fn sync(&mut self) -> Result<()> {
        self.usable_mut()?.sync()
    }

    pub fn lock(&mut self) {
        if let Some(store) = self.inner.as_mut() {
            store.lock();
        }
    }

    pub fn unlock(&mut self, password: &str) -> Result<()> {
        self.usable_mut()?.unlock(password)
    }

    /// Takes effect on disk with the next `sync`.
    pub fn change_password(&mut self, new_password: &str) -> Result<()> {
        self.usable_mut()?.change_password(new_password);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn is_dirty(&self) -> bool {
        self.inner.as_ref().is_some_and(EncryptedStore::is_dirty)
    }

    pub fn is_locked(&self) -> bool {
        self.inner.as_ref().map_or(true, EncryptedStore::is_locked)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.as_ref().map_or(true, EncryptedStore::is_empty)
    }

    pub fn len(&self) -> usize {
        self.inner
            .as_ref()
            .and_then(|store| store.records().ok())
            .map_or(0, |records| records.len())
    }

    /// Last write time reported by the file, shown to users as a
    /// staleness hint.
    pub fn time_of_last_write(&self) -> Option<DateTime<Utc>> {
        self.inner
            .as_ref()
            .and_then(EncryptedStore::time_of_last_write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::MemoryFile;

    fn sample() -> PasswordStore<MemoryFile> {
        let file = MemoryFile::with_contents(
            "pw",
            "amazon.de\tamazon_user\tpassword3\t\nebay\tebay_user2\tpassword2\t\nebay.de\tebay_user1\tpassword1\t\n",
        );
        PasswordStore::open(file, "pw").unwrap()
    }

    fn broken() -> PasswordStore<MemoryFile> {
        PasswordStore::connect(MemoryFile::with_contents("pw", ""), "wrong")
    }

    #[test]
    fn connect_records_failure() {
        let store = broken();
        assert!(!store.is_usable());
        assert!(store.open_error().unwrap().contains("Wrong password"));
        assert!(store.is_locked());
    }

    #[test]
    fn unusable_store_rejects_every_operation() {
        let mut store = broken();
        assert!(matches!(
            store.add(Credential::new("a", "b", "c")),
            Err(PwStoreError::NotUsable(_))
        ));
        assert!(matches!(store.lookup(""), Err(PwStoreError::NotUsable(_))));
        assert!(matches!(store.get(0), Err(PwStoreError::NotUsable(_))));
        assert!(matches!(store.remove(&[0]), Err(PwStoreError::NotUsable(_))));
        assert!(matches!(store.dump(), Err(PwStoreError::NotUsable(_))));
        assert!(matches!(store.sync(), Err(PwStoreError::NotUsable(_))));
        assert!(matches!(
            store.gen_password("u", "x", true, None),
            Err(PwStoreError::NotUsable(_))
        ));
        assert!(matches!(
            store.change_password("x"),
            Err(PwStoreError::NotUsable(_))
        ));
        assert!(matches!(store.unlock("pw"), Err(PwStoreError::NotUsable(_))));
        store.lock();
    }

    #[test]
    fn add_rejects_delimiters_in_fields() {
        let mut store = sample();
        assert!(matches!(
            store.add(Credential::new("a\tb", "u", "p")),
            Err(PwStoreError::InvalidField(_))
        ));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn get_out_of_range_is_invalid_id() {
        let store = sample();
        assert_eq!(store.get(0).unwrap().url, "amazon.de");
        assert!(matches!(store.get(3), Err(PwStoreError::InvalidId(3))));
    }

    #[test]
    fn lookup_with_ids_combines_key_and_ids() {
        let store = sample();
        let matches = store.lookup_with_ids("amazon", &[2, 9]).unwrap();
        let ids: Vec<CredentialId> = matches.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![0, 2]);

        let only_ids = store.lookup_with_ids("", &[1]).unwrap();
        assert_eq!(only_ids.len(), 1);
        assert_eq!(only_ids[0].1.url, "ebay");
    }

    #[test]
    fn gen_password_inserts_record() {
        let mut store = sample();
        let pw = store.gen_password("me", "new.site", true, None).unwrap();
        assert_eq!(pw.len(), DEFAULT_PASSWORD_LEN);
        assert!(pw.bytes().all(|b| (0x20..=0x7e).contains(&b)));

        let found = store.lookup("new.site").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].1.password, pw.as_str());
        assert!(store.is_dirty());
    }

    #[test]
    fn gen_password_with_custom_alphabet() {
        let mut store = sample();
        let pw = store.gen_password("", "", false, Some(b"01")).unwrap();
        assert!(pw.bytes().all(|b| b == b'0' || b == b'1'));
    }

    #[test]
    fn anonymous_generate_and_insert_is_refused() {
        let mut store = sample();
        assert!(matches!(
            store.gen_password("", "", true, None),
            Err(PwStoreError::EmptyOperation(_))
        ));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn anonymous_generate_only_is_allowed() {
        let mut store = sample();
        assert!(store.gen_password("", "", false, None).is_ok());
        assert_eq!(store.len(), 3);
        assert!(!store.is_dirty());
    }

    #[test]
    fn locked_store_reports_locked() {
        let mut store = sample();
        store.lock();
        assert!(store.is_locked());
        assert!(matches!(store.get(0), Err(PwStoreError::Locked)));
        store.unlock("pw").unwrap();
        assert_eq!(store.len(), 3);
    }
}
