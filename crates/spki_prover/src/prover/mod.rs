//! Proof search.
//!
//! A [`Prover`] looks for a chain of certificates that reduces to a
//! statement at least as strong as its target (the *provee*). Certificates
//! are pulled from a [`CertStore`] on demand, wrapped as one-link proofs and
//! inserted into a set of indices; every insertion is composed with the
//! compatible proofs already indexed and the results are inserted in turn.
//!
//! Derived statements are deduplicated by value, so the search terminates on
//! cyclic name and delegation graphs. Name certificates whose subject is
//! itself a name can lengthen the names they rewrite, so a reduction through
//! one is kept only while its subject name is no longer than the provee's
//! (one component when the provee's subject is not a name).
//!
//! The two [`SearchStrategy`] implementations differ only in which selectors
//! they ask the store for.

mod backward;
mod forward;

pub use backward::Backward;
pub use forward::Forward;

use crate::config::{ProverConfig, SearchDirection};
use crate::multimap::MultiMap;
use crate::store::{CertSelector, CertStore, StoreError};
use serde::{Deserialize, Serialize};
use spki_certify::Proof;
use spki_core::{Cert, Name, Principal};
use std::collections::{HashSet, VecDeque};
use std::ops::ControlFlow;
use std::time::Instant;
use tracing::{debug, trace};

/// Decides which store queries a search issues
pub trait SearchStrategy {
    /// Queries issued before anything is known
    fn seeds(&self, provee: &Cert) -> Vec<CertSelector>;

    /// Queries worth issuing once `cert` has been derived
    fn follow(&self, cert: &Cert) -> Vec<CertSelector>;
}

impl SearchDirection {
    /// The strategy implementing this direction
    #[must_use]
    pub fn strategy(self) -> &'static dyn SearchStrategy {
        match self {
            Self::Forward => &Forward,
            Self::Backward => &Backward,
        }
    }
}

/// Errors that abort a search
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProverError {
    /// The certificate store failed
    #[error("certificate store failed: {0}")]
    Store(#[from] StoreError),
}

/// Counters for one search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Store queries issued
    pub fetches: usize,
    /// Certificates returned by those queries
    pub fetched: usize,
    /// Distinct statements indexed
    pub inserted: usize,
    /// Successful reductions
    pub compositions: usize,
    /// Whether the search stopped on a fetch or time budget
    pub budget_exceeded: bool,
}

#[derive(Debug)]
enum Halt {
    Found(Proof),
    OutOfBudget,
}

#[derive(Debug)]
enum Outcome {
    NotStarted,
    Searching,
    Found(Proof),
    Exhausted,
}

/// Search engine for one target statement
pub struct Prover<S> {
    provee: Cert,
    store: S,
    config: ProverConfig,
    strategy: &'static dyn SearchStrategy,
    outcome: Outcome,
    /// Every statement derived so far
    check: MultiMap<Cert, Proof>,
    /// Name definitions with a non-name subject, by defined name
    value: MultiMap<Name, Proof>,
    /// Name definitions with a name subject, by defined name
    value_names: MultiMap<Name, Proof>,
    /// Proofs with a name subject, by the name's first component
    compatible: MultiMap<Name, Proof>,
    /// Authorizations, by issuer
    issuer: MultiMap<Principal, Proof>,
    /// Delegable authorizations, by subject principal
    reverse: MultiMap<Principal, Proof>,
    requested: HashSet<CertSelector>,
    pending: VecDeque<CertSelector>,
    started: Option<Instant>,
    stats: SearchStats,
}

impl<S: CertStore> Prover<S> {
    /// Create a forward prover with default settings
    #[must_use]
    pub fn new(provee: Cert, store: S) -> Self {
        Self::with_config(provee, store, ProverConfig::default())
    }

    /// Create a prover with explicit settings
    #[must_use]
    pub fn with_config(provee: Cert, store: S, config: ProverConfig) -> Self {
        Self {
            provee,
            store,
            strategy: config.direction.strategy(),
            config,
            outcome: Outcome::NotStarted,
            check: MultiMap::new(),
            value: MultiMap::new(),
            value_names: MultiMap::new(),
            compatible: MultiMap::new(),
            issuer: MultiMap::new(),
            reverse: MultiMap::new(),
            requested: HashSet::new(),
            pending: VecDeque::new(),
            started: None,
            stats: SearchStats::default(),
        }
    }

    /// Create an issuer-to-subject prover
    #[must_use]
    pub fn forward(provee: Cert, store: S) -> Self {
        Self::with_config(
            provee,
            store,
            ProverConfig::default().with_direction(SearchDirection::Forward),
        )
    }

    /// Create a subject-to-issuer prover
    #[must_use]
    pub fn backward(provee: Cert, store: S) -> Self {
        Self::with_config(
            provee,
            store,
            ProverConfig::default().with_direction(SearchDirection::Backward),
        )
    }

    /// The statement being proved
    #[must_use]
    pub fn provee(&self) -> &Cert {
        &self.provee
    }

    /// Counters for the search so far
    #[must_use]
    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    /// Run the search, or return its memoized result.
    ///
    /// `Ok(None)` means no proof exists in the store, or a budget ran out.
    ///
    /// # Errors
    ///
    /// Returns [`ProverError::Store`] if a store query fails. The failed
    /// query is kept, so calling again resumes the search.
    pub fn get_proof(&mut self) -> Result<Option<Proof>, ProverError> {
        match &self.outcome {
            Outcome::Found(proof) => return Ok(Some(proof.clone())),
            Outcome::Exhausted => return Ok(None),
            Outcome::Searching => {}
            Outcome::NotStarted => {
                debug!(provee = %self.provee, direction = ?self.config.direction, "starting proof search");
                self.started = Some(Instant::now());
                for selector in self.strategy.seeds(&self.provee) {
                    self.request(selector);
                }
                self.outcome = Outcome::Searching;
            }
        }

        match self.run()? {
            ControlFlow::Break(Halt::Found(proof)) => {
                debug!(links = proof.len(), fetches = self.stats.fetches, "proof found");
                self.outcome = Outcome::Found(proof.clone());
                Ok(Some(proof))
            }
            ControlFlow::Break(Halt::OutOfBudget) => {
                debug!(fetches = self.stats.fetches, "search budget exceeded");
                self.stats.budget_exceeded = true;
                self.outcome = Outcome::Exhausted;
                Ok(None)
            }
            ControlFlow::Continue(()) => {
                debug!(
                    fetches = self.stats.fetches,
                    derived = self.stats.inserted,
                    "search exhausted"
                );
                self.outcome = Outcome::Exhausted;
                Ok(None)
            }
        }
    }

    fn run(&mut self) -> Result<ControlFlow<Halt>, ProverError> {
        while let Some(selector) = self.pending.pop_front() {
            if self.fetches_exhausted() || self.past_deadline() {
                return Ok(ControlFlow::Break(Halt::OutOfBudget));
            }
            let fetched = match self.store.get(&selector) {
                Ok(fetched) => fetched,
                Err(err) => {
                    self.pending.push_front(selector);
                    return Err(err.into());
                }
            };
            self.stats.fetches += 1;
            self.stats.fetched += fetched.len();
            trace!(selector = %selector, found = fetched.len(), "fetched");

            for certificate in fetched {
                if let ControlFlow::Break(halt) = self.insert(Proof::from_certificate(certificate)) {
                    return Ok(ControlFlow::Break(halt));
                }
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    /// Queue a store query unless it was queued before.
    fn request(&mut self, selector: CertSelector) {
        if self.requested.insert(selector.clone()) {
            self.pending.push_back(selector);
        }
    }

    fn fetches_exhausted(&self) -> bool {
        self.config
            .max_fetches
            .is_some_and(|max| self.stats.fetches >= max)
    }

    fn past_deadline(&self) -> bool {
        match (self.started, self.config.deadline()) {
            (Some(start), Some(limit)) => start.elapsed() >= limit,
            _ => false,
        }
    }

    fn insert(&mut self, proof: Proof) -> ControlFlow<Halt> {
        if proof.cert().implies(&self.provee) {
            return ControlFlow::Break(Halt::Found(proof));
        }
        if self.check.contains_key(proof.cert()) {
            return ControlFlow::Continue(());
        }
        if self.past_deadline() {
            return ControlFlow::Break(Halt::OutOfBudget);
        }

        trace!(cert = %proof.cert(), links = proof.len(), "insert");
        self.stats.inserted += 1;
        self.check.insert(proof.cert().clone(), proof.clone());

        let flow = self.extend(&proof);
        if let ControlFlow::Break(Halt::Found(_)) = &flow {
            self.check.remove_key(proof.cert());
        }
        flow
    }

    /// Index `proof` and reduce it against every complementary entry.
    fn extend(&mut self, proof: &Proof) -> ControlFlow<Halt> {
        let cert = proof.cert();
        for selector in self.strategy.follow(cert) {
            self.request(selector);
        }

        if let Some(name) = cert.subject().as_name() {
            let prefix = name.first();
            self.compatible.insert(prefix.clone(), proof.clone());
            for def in self.value.snapshot(&prefix) {
                self.compose(proof, &def, None)?;
            }
            let limit = self.name_limit();
            for def in self.value_names.snapshot(&prefix) {
                self.compose(proof, &def, Some(limit))?;
            }
        }

        match cert {
            Cert::Name(def) => {
                let defined = def.full_name();
                if cert.subject().as_name().is_none() {
                    self.value.insert(defined.clone(), proof.clone());
                    for user in self.compatible.snapshot(&defined) {
                        self.compose(&user, proof, None)?;
                    }
                } else {
                    self.value_names.insert(defined.clone(), proof.clone());
                    let limit = self.name_limit();
                    for user in self.compatible.snapshot(&defined) {
                        self.compose(&user, proof, Some(limit))?;
                    }
                }
            }
            Cert::Auth(grant) => {
                let issuer = &grant.body.issuer;
                self.issuer.insert(issuer.clone(), proof.clone());
                for left in self.reverse.snapshot(issuer) {
                    self.compose(&left, proof, None)?;
                }

                if let Some(delegate) = grant
                    .body
                    .subject
                    .as_principal()
                    .filter(|_| grant.auth.propagate)
                {
                    self.reverse.insert(delegate.clone(), proof.clone());
                    for right in self.issuer.snapshot(delegate) {
                        self.compose(proof, &right, None)?;
                    }
                }
            }
        }
        ControlFlow::Continue(())
    }

    /// Longest subject name kept from a reduction through a name-to-name
    /// definition: the provee's subject name, or a single component.
    fn name_limit(&self) -> usize {
        self.provee
            .subject()
            .as_name()
            .map_or(1, |name| name.names().len())
    }

    fn compose(&mut self, left: &Proof, right: &Proof, limit: Option<usize>) -> ControlFlow<Halt> {
        let derived = match left.compose(right) {
            Ok(derived) => derived,
            Err(reason) => {
                trace!(%reason, "skipped");
                return ControlFlow::Continue(());
            }
        };
        let too_long = derived
            .cert()
            .subject()
            .as_name()
            .zip(limit)
            .is_some_and(|(name, limit)| name.names().len() > limit);
        if too_long {
            trace!(derived = %derived.cert(), "name too long");
            return ControlFlow::Continue(());
        }
        self.stats.compositions += 1;
        trace!(derived = %derived.cert(), "composed");
        self.insert(derived)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCertStore;
    use spki_certify::{Certificate, Signer};
    use spki_core::{Subject, Tag, Validity};
    use std::cell::RefCell;
    use std::time::Duration;

    fn signer(b: u8) -> Signer {
        Signer::from_secret(&[b; 32]).unwrap()
    }

    fn k(b: u8) -> Principal {
        signer(b).public_key().into()
    }

    fn signed(cert: Cert) -> Certificate {
        let issuer = (0..=u8::MAX)
            .map(signer)
            .find(|s| cert.issuer().matches_key(&s.public_key()))
            .unwrap();
        Certificate::sign(cert, &issuer).unwrap()
    }

    fn store(certs: Vec<Cert>) -> MemoryCertStore {
        certs.into_iter().map(signed).collect()
    }

    fn search(direction: SearchDirection, provee: Cert, store: &MemoryCertStore) -> Option<Proof> {
        let config = ProverConfig::default().with_direction(direction);
        Prover::with_config(provee, store, config).get_proof().unwrap()
    }

    const BOTH: [SearchDirection; 2] = [SearchDirection::Forward, SearchDirection::Backward];

    /// Store that records every query it serves
    struct Recording {
        inner: MemoryCertStore,
        seen: RefCell<Vec<CertSelector>>,
    }

    impl CertStore for Recording {
        fn get(&self, selector: &CertSelector) -> Result<Vec<Certificate>, StoreError> {
            self.seen.borrow_mut().push(selector.clone());
            self.inner.get(selector)
        }
    }

    struct Broken;

    impl CertStore for Broken {
        fn get(&self, _selector: &CertSelector) -> Result<Vec<Certificate>, StoreError> {
            Err(StoreError::Io {
                reason: "directory offline".into(),
            })
        }
    }

    fn friends_chain() -> (MemoryCertStore, Cert) {
        let friends = spki_core::Name::local(k(1), "friends");
        let certs = store(vec![
            Cert::auth(k(1), friends, Tag::prefix("/docs"), true),
            Cert::name(k(1), "friends", k(2)),
            Cert::auth(k(2), k(3), Tag::string("/docs/a"), false),
        ]);
        (certs, Cert::auth(k(1), k(3), Tag::string("/docs/a"), false))
    }

    #[test]
    fn test_single_grant() {
        let certs = store(vec![Cert::auth(k(1), k(2), Tag::string("read"), false)]);
        for direction in BOTH {
            let found = search(direction, Cert::auth(k(1), k(2), Tag::string("read"), false), &certs)
                .unwrap();
            assert_eq!(found.len(), 1);
            assert!(found.verify().is_ok());

            let transitive = Cert::auth(k(1), k(3), Tag::string("read"), true);
            assert_eq!(search(direction, transitive, &certs), None);
        }
    }

    #[test]
    fn test_stronger_certificate_satisfies_weaker_target() {
        let certs = store(vec![Cert::auth(k(1), k(2), Tag::prefix("r"), true)]);
        for direction in BOTH {
            let found = search(direction, Cert::auth(k(1), k(2), Tag::string("read"), false), &certs)
                .unwrap();
            assert_eq!(found.cert(), &Cert::auth(k(1), k(2), Tag::prefix("r"), true));
        }
    }

    #[test]
    fn test_grant_through_local_name() {
        let friends = spki_core::Name::local(k(1), "friends");
        let certs = store(vec![
            Cert::auth(k(1), friends, Tag::string("write"), false),
            Cert::name(k(1), "friends", k(3)),
        ]);
        let target = Cert::auth(k(1), k(3), Tag::string("write"), false);
        for direction in BOTH {
            let proof = search(direction, target.clone(), &certs).unwrap();
            assert_eq!(proof.len(), 2);
            assert_eq!(proof.cert().subject(), &Subject::from(k(3)));
            assert_eq!(proof.cert().as_auth().unwrap().auth.tag, Tag::string("write"));
            assert!(proof.verify().is_ok());
        }
    }

    #[test]
    fn test_name_then_delegation() {
        let (certs, target) = friends_chain();
        for direction in BOTH {
            let proof = search(direction, target.clone(), &certs).unwrap();
            assert_eq!(proof.len(), 3);
            assert_eq!(proof.cert(), &target);
            assert!(proof.verify().is_ok());
        }
    }

    #[test]
    fn test_multi_component_name() {
        let deep = spki_core::Name::new(k(2), vec!["staff".into(), "leads".into()]).unwrap();
        let certs = store(vec![
            Cert::auth(k(1), deep, Tag::All, false),
            Cert::name(k(2), "staff", k(4)),
            Cert::name(k(4), "leads", k(5)),
        ]);
        let target = Cert::auth(k(1), k(5), Tag::string("anything"), false);
        for direction in BOTH {
            let proof = search(direction, target.clone(), &certs).unwrap();
            assert_eq!(proof.len(), 3);
            assert!(proof.verify().is_ok());
        }
    }

    #[test]
    fn test_grant_to_a_name_through_name_definition() {
        let a = spki_core::Name::local(k(1), "a");
        let b = spki_core::Name::local(k(2), "b");
        let certs = store(vec![
            Cert::auth(k(0), a, Tag::All, false),
            Cert::name(k(1), "a", b.clone()),
        ]);
        let target = Cert::auth(k(0), b, Tag::All, false);
        for direction in BOTH {
            let proof = search(direction, target.clone(), &certs).unwrap();
            assert_eq!(proof.len(), 2);
            assert_eq!(proof.cert(), &target);
            assert!(proof.verify().is_ok());
        }
    }

    #[test]
    fn test_grant_through_chained_name_definitions() {
        let a = spki_core::Name::local(k(1), "a");
        let b = spki_core::Name::local(k(2), "b");
        let certs = store(vec![
            Cert::auth(k(0), a, Tag::string("read"), false),
            Cert::name(k(1), "a", b),
            Cert::name(k(2), "b", k(3)),
        ]);
        let target = Cert::auth(k(0), k(3), Tag::string("read"), false);
        for direction in BOTH {
            let proof = search(direction, target.clone(), &certs).unwrap();
            assert_eq!(proof.len(), 3);
            assert!(proof.verify().is_ok());
        }
    }

    #[test]
    fn test_found_insert_leaves_no_check_entry() {
        let (certs, target) = friends_chain();
        let mut prover = Prover::backward(target, &certs);
        let proof = prover.get_proof().unwrap().unwrap();
        assert_eq!(proof.len(), 3);

        let friends = spki_core::Name::local(k(1), "friends");
        let grant = Cert::auth(k(1), friends, Tag::prefix("/docs"), true);
        let resolved = grant.compose(&Cert::name(k(1), "friends", k(2))).unwrap();
        // Both were still being extended when the full chain reduced.
        assert!(!prover.check.contains_key(&grant));
        assert!(!prover.check.contains_key(&resolved));
        assert!(!prover.check.contains_key(proof.cert()));
        // Fully extended entries stay.
        assert!(prover.check.contains_key(&Cert::name(k(1), "friends", k(2))));
        assert!(prover.check.contains_key(&Cert::auth(k(2), k(3), Tag::string("/docs/a"), false)));
        assert_eq!(prover.check.len(), 2);
    }

    #[test]
    fn test_name_cycle_terminates() {
        let n1 = spki_core::Name::local(k(1), "n1");
        let n2 = spki_core::Name::local(k(2), "n2");
        let certs = store(vec![
            Cert::name(k(1), "n1", n2),
            Cert::name(k(2), "n2", n1),
            Cert::auth(k(1), k(2), Tag::All, true),
            Cert::auth(k(2), k(1), Tag::All, true),
        ]);
        let unrelated = Cert::auth(k(1), k(9), Tag::string("read"), false);
        for direction in BOTH {
            let mut prover = Prover::with_config(
                unrelated.clone(),
                &certs,
                ProverConfig::default().with_direction(direction),
            );
            assert_eq!(prover.get_proof().unwrap(), None);
            assert!(!prover.stats().budget_exceeded);
        }
    }

    #[test]
    fn test_each_selector_fetched_once() {
        let (inner, target) = friends_chain();
        let unreachable = Cert::auth(k(1), k(7), Tag::All, false);
        for direction in BOTH {
            for provee in [target.clone(), unreachable.clone()] {
                let recording = Recording {
                    inner: store(inner.iter().map(|c| c.cert.clone()).collect()),
                    seen: RefCell::new(Vec::new()),
                };
                let mut prover = Prover::with_config(
                    provee,
                    &recording,
                    ProverConfig::default().with_direction(direction),
                );
                prover.get_proof().unwrap();
                let seen = recording.seen.borrow();
                let distinct: HashSet<_> = seen.iter().collect();
                assert_eq!(distinct.len(), seen.len());
                assert_eq!(prover.stats().fetches, seen.len());
            }
        }
    }

    #[test]
    fn test_result_is_memoized() {
        let (certs, target) = friends_chain();
        let mut prover = Prover::forward(target, &certs);
        let first = prover.get_proof().unwrap();
        let queries = certs.queries();
        assert_eq!(prover.get_proof().unwrap(), first);
        assert_eq!(certs.queries(), queries);
    }

    #[test]
    fn test_fetch_budget() {
        let (certs, target) = friends_chain();
        let config = ProverConfig::default().with_max_fetches(1);
        let mut prover = Prover::with_config(target, &certs, config);
        assert_eq!(prover.get_proof().unwrap(), None);
        let stats = prover.stats();
        assert!(stats.budget_exceeded);
        assert_eq!(stats.fetches, 1);
    }

    #[test]
    fn test_deadline() {
        let (certs, target) = friends_chain();
        let config = ProverConfig::default().with_deadline(Duration::ZERO);
        let mut prover = Prover::with_config(target, &certs, config);
        assert_eq!(prover.get_proof().unwrap(), None);
        assert!(prover.stats().budget_exceeded);
    }

    #[test]
    fn test_store_failure_is_an_error() {
        let target = Cert::auth(k(1), k(2), Tag::All, false);
        let mut prover = Prover::new(target, Broken);
        assert!(matches!(prover.get_proof(), Err(ProverError::Store(StoreError::Io { .. }))));
    }

    #[test]
    fn test_validity_must_cover_target() {
        let t = |s| chrono::DateTime::from_timestamp(s, 0).unwrap();
        let window = |a, b| Validity::new().with_not_before(t(a)).with_not_after(t(b));
        let certs = store(vec![
            Cert::auth(k(1), k(2), Tag::All, true).with_validity(window(0, 100)),
            Cert::auth(k(2), k(3), Tag::All, false).with_validity(window(50, 200)),
        ]);
        for direction in BOTH {
            let inside = Cert::auth(k(1), k(3), Tag::All, false).with_validity(window(60, 90));
            let proof = search(direction, inside, &certs).unwrap();
            assert_eq!(proof.cert().body().validity, Some(window(50, 100)));

            let outside = Cert::auth(k(1), k(3), Tag::All, false).with_validity(window(10, 90));
            assert_eq!(search(direction, outside, &certs), None);
        }
    }

    #[test]
    fn test_directions_agree() {
        let (certs, _) = friends_chain();
        let targets = [
            Cert::auth(k(1), k(3), Tag::string("/docs/a"), false),
            Cert::auth(k(1), k(3), Tag::string("/docs/b"), false),
            Cert::auth(k(1), k(2), Tag::string("/docs/x"), true),
            Cert::auth(k(2), k(3), Tag::All, false),
            Cert::name(k(1), "friends", k(2)),
            Cert::name(k(1), "friends", k(3)),
        ];
        for target in targets {
            let forward = search(SearchDirection::Forward, target.clone(), &certs);
            let backward = search(SearchDirection::Backward, target.clone(), &certs);
            assert_eq!(forward.is_some(), backward.is_some(), "{}", target);
        }
    }
}
