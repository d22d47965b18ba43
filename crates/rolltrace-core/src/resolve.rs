//! QR identity resolution.
//!
//! Any QR a roll has ever carried resolves to the same root by walking link
//! edges backwards, and the root's forward closure recovers every label the
//! roll has carried. Both walks keep a visited set, so a cyclic graph (which
//! append-only relabeling can produce) still terminates.

use std::collections::{BTreeSet, HashSet};

use crate::{
  roll::Roll,
  store::{LinkStore, TrackStore},
};

/// Walk backwards from `qr` to the label the roll carried at intake.
///
/// Each step follows the most recently created edge into the current QR.
/// The walk stops at a QR with no incoming edge, or before stepping onto a
/// QR it has already visited. Depth is unbounded.
pub async fn resolve_root<G: LinkStore>(
  graph: &G,
  qr: &str,
) -> Result<String, G::Error> {
  let mut visited = HashSet::from([qr.to_owned()]);
  let mut current = qr.to_owned();

  while let Some(link) = graph.latest_link_to(&current).await? {
    if !visited.insert(link.previous_qr_value.clone()) {
      break;
    }
    current = link.previous_qr_value;
  }

  Ok(current)
}

/// Every QR reachable from `root` along link edges, `root` included.
///
/// Breadth-first, one [`LinkStore::successors`] call per level; a QR already
/// in the result is never expanded twice.
pub async fn forward_closure<G: LinkStore>(
  graph: &G,
  root: &str,
) -> Result<BTreeSet<String>, G::Error> {
  let mut seen = BTreeSet::from([root.to_owned()]);
  let mut frontier = vec![root.to_owned()];

  while !frontier.is_empty() {
    let next = graph.successors(&frontier).await?;
    frontier = next.into_iter().filter(|qr| seen.insert(qr.clone())).collect();
  }

  Ok(seen)
}

/// Resolve `qr` to its root and look up the roll taken in under that root.
/// Resolution goes through [`LinkStore::root_of`].
///
/// A missing roll is `Ok((None, root))`, never an error.
pub async fn roll_by_any_qr<S: TrackStore>(
  store: &S,
  qr: &str,
) -> Result<(Option<Roll>, String), S::Error> {
  let root = store.root_of(qr).await?;
  let roll = store.get_roll_by_qr(&root).await?;
  Ok((roll, root))
}
