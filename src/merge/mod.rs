//! Merge two databases into a new third one.
//!
//! Both sources are dumped, compared by record value (ids are ignored)
//! with a single sorted merge walk, and split into their intersection
//! and the two complements. The intersection always goes into the
//! destination; the caller decides about each complement.
//!
//! Value-identical duplicates inside one source are matched one-for-one,
//! like a multiset: two copies of D in A and one in B put one D in the
//! intersection and the other in A − B. The union written to the
//! destination is still right, but which physical copy lands in which
//! set is arbitrary. `duplicates` can report such records beforehand.

use std::cmp::Ordering;
use std::path::Path;

use crate::errors::{PwStoreError, Result};
use crate::store::{CipherFile, Credential, CredentialId, PasswordStore};

/// Records paired with their id in the source they were taken from.
pub type Entries = Vec<(CredentialId, Credential)>;

/// Everything the caller needs to decide on a merge.
pub struct MergePlan {
    /// Full dump of the first source.
    pub a: Entries,
    /// Full dump of the second source.
    pub b: Entries,
    /// Records in both sources (ids refer to A).
    pub intersection: Entries,
    /// Records only in A, i.e. A − B (ids refer to A).
    pub complement_a_in_b: Entries,
    /// Records only in B, i.e. B − A (ids refer to B).
    pub complement_b_in_a: Entries,
}

/// Which complement the caller is being asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Complement {
    /// A − B
    AInB,
    /// B − A
    BInA,
}

/// What a finished merge wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    pub inserted: usize,
    pub used_a_in_b: bool,
    pub used_b_in_a: bool,
}

/// The interactive side of a merge.
pub trait MergeCaller {
    type File: CipherFile;

    /// Show all five sets.
    fn present(&mut self, plan: &MergePlan);

    /// Whether `complement` should go into the destination.
    fn accept(&mut self, complement: Complement, entries: &[(CredentialId, Credential)])
        -> Result<bool>;

    /// Create the (not yet existing) destination store at `path`.
    fn open_destination(&mut self, path: &Path) -> Result<PasswordStore<Self::File>>;
}

/// Fail with `DestinationExists` if something is already at `path`.
pub fn ensure_destination_free(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(PwStoreError::DestinationExists(path.to_path_buf()));
    }
    Ok(())
}

/// Dump both sources and split them into intersection and complements.
pub fn plan<F: CipherFile, G: CipherFile>(
    a: &PasswordStore<F>,
    b: &PasswordStore<G>,
) -> Result<MergePlan> {
    let mut a = a.dump()?;
    let mut b = b.dump()?;
    // Dumps come out sorted already; the walk below depends on it.
    a.sort_by(|x, y| x.1.cmp(&y.1));
    b.sort_by(|x, y| x.1.cmp(&y.1));

    let (intersection, complement_a_in_b, complement_b_in_a) = split_sorted(&a, &b);
    Ok(MergePlan {
        a,
        b,
        intersection,
        complement_a_in_b,
        complement_b_in_a,
    })
}

/// One merge walk over two sorted sequences.
///
/// Returns (A ∩ B, A − B, B − A) with multiset semantics.
fn split_sorted(
    a: &[(CredentialId, Credential)],
    b: &[(CredentialId, Credential)],
) -> (Entries, Entries, Entries) {
    let mut both = Vec::new();
    let mut only_a = Vec::new();
    let mut only_b = Vec::new();

    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].1.cmp(&b[j].1) {
            Ordering::Less => {
                only_a.push(a[i].clone());
                i += 1;
            }
            Ordering::Greater => {
                only_b.push(b[j].clone());
                j += 1;
            }
            Ordering::Equal => {
                both.push(a[i].clone());
                i += 1;
                j += 1;
            }
        }
    }
    only_a.extend_from_slice(&a[i..]);
    only_b.extend_from_slice(&b[j..]);

    (both, only_a, only_b)
}

/// Pairs of ids whose records are value-identical, for a sorted dump.
pub fn duplicates(entries: &[(CredentialId, Credential)]) -> Vec<(CredentialId, CredentialId)> {
    entries
        .windows(2)
        .filter(|pair| pair[0].1 == pair[1].1)
        .map(|pair| (pair[0].0, pair[1].0))
        .collect()
}

/// Merge `a` and `b` into a new database at `destination`.
pub fn merge<F, G, C>(
    a: &PasswordStore<F>,
    b: &PasswordStore<G>,
    destination: &Path,
    caller: &mut C,
) -> Result<MergeOutcome>
where
    F: CipherFile,
    G: CipherFile,
    C: MergeCaller,
{
    ensure_destination_free(destination)?;

    let plan = plan(a, b)?;
    caller.present(&plan);

    let used_a_in_b = caller.accept(Complement::AInB, &plan.complement_a_in_b)?;
    let used_b_in_a = caller.accept(Complement::BInA, &plan.complement_b_in_a)?;

    ensure_destination_free(destination)?;
    let mut out = caller.open_destination(destination)?;

    let mut inserted = 0;
    let accepted = [
        (true, &plan.intersection),
        (used_a_in_b, &plan.complement_a_in_b),
        (used_b_in_a, &plan.complement_b_in_a),
    ];
    for (_, entries) in accepted.iter().filter(|(use_it, _)| *use_it) {
        for (_, record) in entries.iter() {
            out.add(record.clone())?;
            inserted += 1;
        }
    }
    out.sync()?;

    tracing::info!(
        inserted,
        used_a_in_b,
        used_b_in_a,
        destination = %destination.display(),
        "merge written"
    );

    Ok(MergeOutcome {
        inserted,
        used_a_in_b,
        used_b_in_a,
    })
}
