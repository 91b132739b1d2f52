//! Initial copier plan generation

use crate::naming::{assign_identity, is_synchronized, names_origin};
use crate::plan::SyncPlan;
use crate::types::{SetupAction, SyncRoot};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::warn;

/// Where the copies of one identity are taken from
#[derive(Debug)]
struct Source {
    track: String,
    path: PathBuf,
    size: u64,
}

/// Generate the plan that brings `root` to the synchronized state.
///
/// 1. Every setup without a sync identity is renamed to a fresh one.
/// 2. Every identity is copied into each track that lacks it. Presence is
///    judged by name only; existing copies are never overwritten.
///
/// Running this on a synchronized root yields an empty plan.
///
/// # Example
/// ```
/// use setupsync::plan::generate_init_plan;
/// use setupsync::types::{SetupFile, SyncRoot};
/// use std::path::PathBuf;
/// use std::time::UNIX_EPOCH;
///
/// let mut root = SyncRoot::new(PathBuf::from("/setups"));
/// root.add_track("Spa");
/// root.insert(SetupFile::new(
///     "Monza".to_string(),
///     "Race1.json".to_string(),
///     PathBuf::from("/setups/Monza/Race1.json"),
///     4,
///     UNIX_EPOCH,
/// ));
///
/// let plan = generate_init_plan(&root);
/// assert_eq!(plan.stats.rename_count, 1);
/// assert_eq!(plan.stats.copy_count, 1);
/// ```
pub fn generate_init_plan(root: &SyncRoot) -> SyncPlan {
    let mut plan = SyncPlan::new();
    let mut taken: BTreeSet<String> = root.all_names();
    let mut sources: BTreeMap<String, Source> = BTreeMap::new();

    for setup in root.iter() {
        if is_synchronized(&setup.name) {
            continue;
        }

        match assign_identity(&setup.name, &setup.track, |name| taken.contains(name)) {
            Ok(identity) => {
                let to = root.setup_path(&setup.track, &identity);
                plan.add_action(SetupAction::Rename {
                    from: setup.path.clone(),
                    to: to.clone(),
                });
                taken.insert(identity.clone());
                sources.insert(
                    identity,
                    Source {
                        track: setup.track.clone(),
                        path: to,
                        size: setup.size,
                    },
                );
            }
            Err(e) => {
                warn!(path = %setup.path.display(), error = %e, "Cannot assign identity, skipping");
                plan.collisions.push(setup.path.clone());
            }
        }
    }

    for name in root.all_names() {
        if !is_synchronized(&name) {
            continue;
        }
        let holders: Vec<&str> = root
            .track_names()
            .filter(|track| root.contains(track, &name))
            .collect();
        let Some(track) = holders
            .iter()
            .find(|track| names_origin(&name, track))
            .or_else(|| holders.first())
        else {
            continue;
        };
        let Some(setup) = root.get(track, &name) else {
            continue;
        };
        sources.insert(
            name,
            Source {
                track: setup.track.clone(),
                path: setup.path.clone(),
                size: setup.size,
            },
        );
    }

    for (identity, source) in &sources {
        for track in root.track_names() {
            if track == source.track || root.contains(track, identity) {
                continue;
            }
            plan.add_action(SetupAction::Copy {
                source: source.path.clone(),
                dest: root.setup_path(track, identity),
                size: source.size,
            });
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SetupFile;
    use std::time::UNIX_EPOCH;

    fn root_with(tracks: &[&str], setups: &[(&str, &str, u64)]) -> SyncRoot {
        let mut root = SyncRoot::new(PathBuf::from("/setups"));
        for track in tracks {
            root.add_track(track);
        }
        for (track, name, size) in setups {
            let path = root.setup_path(track, name);
            root.insert(SetupFile::new(
                track.to_string(),
                name.to_string(),
                path,
                *size,
                UNIX_EPOCH,
            ));
        }
        root
    }

    fn copies(plan: &SyncPlan) -> Vec<(PathBuf, PathBuf)> {
        plan.actions
            .iter()
            .filter_map(|a| match a {
                SetupAction::Copy { source, dest, .. } => Some((source.clone(), dest.clone())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_scenario_single_setup() {
        let root = root_with(&["Monza", "Spa"], &[("Monza", "Race1.json", 10)]);
        let plan = generate_init_plan(&root);

        assert_eq!(
            plan.actions[0],
            SetupAction::Rename {
                from: PathBuf::from("/setups/Monza/Race1.json"),
                to: PathBuf::from("/setups/Monza/Race1__sync-Monza.json"),
            }
        );
        assert_eq!(
            copies(&plan),
            vec![(
                PathBuf::from("/setups/Monza/Race1__sync-Monza.json"),
                PathBuf::from("/setups/Spa/Race1__sync-Monza.json"),
            )]
        );
        assert_eq!(plan.stats.total_bytes, 10);
    }

    #[test]
    fn test_synchronized_root_yields_empty_plan() {
        let root = root_with(
            &["Monza", "Spa"],
            &[
                ("Monza", "Race1__sync-Monza.json", 10),
                ("Spa", "Race1__sync-Monza.json", 10),
            ],
        );
        let plan = generate_init_plan(&root);
        assert!(plan.actions.is_empty());
    }

    #[test]
    fn test_partial_sync_is_healed_from_origin() {
        let root = root_with(
            &["Monza", "Spa", "Zolder"],
            &[
                ("Monza", "Race1__sync-Monza.json", 10),
                ("Spa", "Race1__sync-Monza.json", 10),
            ],
        );
        let plan = generate_init_plan(&root);

        assert_eq!(plan.stats.rename_count, 0);
        assert_eq!(
            copies(&plan),
            vec![(
                PathBuf::from("/setups/Monza/Race1__sync-Monza.json"),
                PathBuf::from("/setups/Zolder/Race1__sync-Monza.json"),
            )]
        );
    }

    #[test]
    fn test_missing_origin_uses_first_holder() {
        let root = root_with(
            &["Monza", "Spa", "Zolder"],
            &[("Zolder", "Race1__sync-Monza.json", 10), ("Spa", "Race1__sync-Monza.json", 10)],
        );
        let plan = generate_init_plan(&root);

        let sources: BTreeSet<_> = copies(&plan).into_iter().map(|(s, _)| s).collect();
        assert_eq!(
            sources.into_iter().collect::<Vec<_>>(),
            vec![PathBuf::from("/setups/Spa/Race1__sync-Monza.json")]
        );
    }

    #[test]
    fn test_same_name_on_two_tracks_does_not_collide() {
        let root = root_with(
            &["TrackA", "TrackB"],
            &[("TrackA", "MySetup.json", 1), ("TrackB", "MySetup.json", 2)],
        );
        let plan = generate_init_plan(&root);

        let dests: BTreeSet<_> = copies(&plan).into_iter().map(|(_, d)| d).collect();
        assert!(dests.contains(&PathBuf::from("/setups/TrackB/MySetup__sync-TrackA.json")));
        assert!(dests.contains(&PathBuf::from("/setups/TrackA/MySetup__sync-TrackB.json")));
        assert_eq!(plan.stats.rename_count, 2);
    }

    #[test]
    fn test_existing_identity_forces_disambiguator() {
        let root = root_with(
            &["Monza", "Spa"],
            &[
                ("Monza", "Race1.json", 1),
                ("Spa", "Race1__sync-Monza.json", 1),
            ],
        );
        let plan = generate_init_plan(&root);

        assert!(plan.actions.contains(&SetupAction::Rename {
            from: PathBuf::from("/setups/Monza/Race1.json"),
            to: PathBuf::from("/setups/Monza/Race1__sync-Monza-2.json"),
        }));
        // the existing identity is still healed into Monza
        assert!(copies(&plan).contains(&(
            PathBuf::from("/setups/Spa/Race1__sync-Monza.json"),
            PathBuf::from("/setups/Monza/Race1__sync-Monza.json"),
        )));
    }

    #[test]
    fn test_never_copies_onto_origin_track() {
        let root = root_with(
            &["Monza", "Spa", "Suzuka"],
            &[("Monza", "a.json", 1), ("Spa", "b.json", 1)],
        );
        let plan = generate_init_plan(&root);

        for (source, dest) in copies(&plan) {
            assert_ne!(source.parent(), dest.parent());
        }
        assert_eq!(plan.stats.copy_count, 4);
    }

    #[test]
    fn test_single_track_only_renames() {
        let root = root_with(&["Monza"], &[("Monza", "a.json", 1)]);
        let plan = generate_init_plan(&root);
        assert_eq!(plan.stats.rename_count, 1);
        assert_eq!(plan.stats.copy_count, 0);
    }
}
