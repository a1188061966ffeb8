//! Which wizard controls are shown or enabled
//!
//! Recomputed from the current inputs whenever something is drawn, so
//! no handler has to remember to show or hide anything.

use super::selector::ImageSource;
use crate::servers::ServerChoice;

#[derive(Debug, Clone)]
pub struct VisibilityInput<'a> {
    pub server_choice: ServerChoice,
    pub load_balance: bool,
    /// Local server can run this device type on this platform
    pub local_available: bool,
    pub cloud_enabled: bool,
    pub sources: &'a [ImageSource],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorVisibility {
    pub image_list: bool,
    pub path_entry: bool,
    pub browse: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visibility {
    pub local_enabled: bool,
    pub cloud_visible: bool,
    /// Remote server list and the load-balance checkbox
    pub remote_group_enabled: bool,
    /// Manual pick of a remote server
    pub remote_chooser_enabled: bool,
    pub selectors: Vec<SelectorVisibility>,
}

pub fn compute(input: &VisibilityInput<'_>) -> Visibility {
    let remote = input.server_choice == ServerChoice::Remote;

    let selectors = input
        .sources
        .iter()
        .map(|source| {
            let existing = *source == ImageSource::Existing;
            SelectorVisibility {
                image_list: existing,
                path_entry: !existing,
                // Remote hosts cannot be browsed from here
                browse: !existing && !remote,
            }
        })
        .collect();

    Visibility {
        local_enabled: input.local_available,
        cloud_visible: input.cloud_enabled,
        remote_group_enabled: remote,
        remote_chooser_enabled: remote && !input.load_balance,
        selectors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(choice: ServerChoice, load_balance: bool, sources: &[ImageSource]) -> Visibility {
        compute(&VisibilityInput {
            server_choice: choice,
            load_balance,
            local_available: true,
            cloud_enabled: false,
            sources,
        })
    }

    #[test]
    fn test_local_server() {
        let v = input(ServerChoice::Local, false, &[ImageSource::Manual]);
        assert!(!v.remote_group_enabled);
        assert!(!v.remote_chooser_enabled);
        assert_eq!(
            v.selectors[0],
            SelectorVisibility {
                image_list: false,
                path_entry: true,
                browse: true
            }
        );
    }

    #[test]
    fn test_remote_hides_every_browse_button() {
        let v = input(
            ServerChoice::Remote,
            false,
            &[ImageSource::Manual, ImageSource::Manual, ImageSource::Existing],
        );
        assert!(v.remote_group_enabled);
        assert!(v.remote_chooser_enabled);
        assert!(v.selectors.iter().all(|s| !s.browse));
        assert!(v.selectors[0].path_entry);
        assert!(v.selectors[2].image_list);
    }

    #[test]
    fn test_load_balance_disables_manual_choice() {
        let v = input(ServerChoice::Remote, true, &[]);
        assert!(v.remote_group_enabled);
        assert!(!v.remote_chooser_enabled);

        // Checkbox state has no effect outside remote mode
        let v = input(ServerChoice::Local, true, &[]);
        assert!(!v.remote_chooser_enabled);
    }

    #[test]
    fn test_existing_image_mode() {
        let v = input(ServerChoice::Local, false, &[ImageSource::Existing]);
        assert_eq!(
            v.selectors[0],
            SelectorVisibility {
                image_list: true,
                path_entry: false,
                browse: false
            }
        );
    }

    #[test]
    fn test_platform_and_cloud_flags() {
        let v = compute(&VisibilityInput {
            server_choice: ServerChoice::Remote,
            load_balance: false,
            local_available: false,
            cloud_enabled: true,
            sources: &[],
        });
        assert!(!v.local_enabled);
        assert!(v.cloud_visible);
    }
}
