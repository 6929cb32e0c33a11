use super::state;
use crate::catalog::ActionCatalog;
use crate::config::CatalogConfig;
use crate::types::Allocation;

fn default_catalog() -> ActionCatalog {
    ActionCatalog::new(CatalogConfig::default(), 100.0)
}

#[test]
fn test_entries_are_normalized() {
    let catalog = default_catalog();
    assert_eq!(catalog.len(), 16);
    for entry in catalog.allocations() {
        assert!((entry.sum() - 1.0).abs() < 1e-5);
        assert!(entry.as_array().iter().all(|&r| r >= 0.0));
    }
}

#[test]
fn test_everything_valid_when_calm() {
    let catalog = default_catalog();
    let calm = state((5, 10.0, 95.0), (5, 10.0, 95.0), (5, 10.0, 95.0));
    assert_eq!(catalog.valid_indices(&calm), (0..16).collect::<Vec<_>>());
}

#[test]
fn test_severe_congestion_caps_video() {
    let catalog = default_catalog();
    let severe = state((5, 50.0, 40.0), (5, 50.0, 40.0), (5, 100.0, 40.0));
    let valid = catalog.valid_indices(&severe);
    assert!(!valid.is_empty());
    for &i in &valid {
        assert!(catalog.get(i).video <= 0.5 + 1e-6);
    }
    for excluded in [7, 8, 14, 15] {
        assert!(!valid.contains(&excluded));
    }
}

#[test]
fn test_moderate_congestion_uses_looser_cap() {
    let catalog = default_catalog();
    let moderate = state((5, 40.0, 70.0), (5, 40.0, 70.0), (5, 40.0, 70.0));
    let valid = catalog.valid_indices(&moderate);
    assert!(valid.contains(&0));
    assert!(valid.contains(&7));
    assert!(!valid.contains(&14));
    assert!(!valid.contains(&15));
}

#[test]
fn test_multi_class_starvation_restricts_to_protective() {
    let catalog = default_catalog();
    let starving = state((5, 10.0, 10.0), (5, 5.0, 10.0), (5, 10.0, 90.0));
    assert_eq!(catalog.valid_indices(&starving), vec![0, 1, 2, 12, 13]);
}

#[test]
fn test_single_starving_class_does_not_trigger_protection() {
    let catalog = default_catalog();
    let one = state((5, 10.0, 10.0), (5, 5.0, 90.0), (5, 10.0, 90.0));
    assert_eq!(catalog.valid_indices(&one).len(), 16);
}

#[test]
fn test_empty_mask_falls_back_to_full_catalog() {
    let config = CatalogConfig {
        entries: vec![Allocation::new(0.05, 0.05, 0.9), Allocation::new(0.1, 0.1, 0.8)],
        protective: vec![0],
        priority: vec![0],
        ..CatalogConfig::default()
    };
    let catalog = ActionCatalog::new(config, 100.0);
    let severe = state((5, 100.0, 40.0), (5, 100.0, 40.0), (5, 100.0, 40.0));
    assert_eq!(catalog.valid_indices(&severe), vec![0, 1]);
}

#[test]
fn test_out_of_range_subset_indices_are_dropped() {
    let config = CatalogConfig {
        protective: vec![3, 42],
        priority: vec![99],
        ..CatalogConfig::default()
    };
    let catalog = ActionCatalog::new(config, 100.0);
    assert_eq!(catalog.protective(), &[3]);
    assert_eq!(catalog.priority(), &[0]);
}

#[test]
fn test_get_clamps_index() {
    let catalog = default_catalog();
    assert_eq!(catalog.get(999), catalog.get(15));
}

#[test]
fn test_nearest_index() {
    let catalog = default_catalog();
    for (i, entry) in catalog.allocations().iter().enumerate() {
        assert_eq!(catalog.nearest_index(entry), i);
    }
    // Unnormalised input is compared after normalising
    assert_eq!(catalog.nearest_index(&Allocation::new(1.0, 1.0, 18.0)), 15);
    assert_eq!(catalog.nearest_index(&Allocation::new(0.0, 0.0, 0.0)), 0);
}

#[test]
fn test_nearest_index_ties_go_to_first() {
    let config = CatalogConfig {
        entries: vec![
            Allocation::new(0.6, 0.2, 0.2),
            Allocation::new(0.2, 0.6, 0.2),
            Allocation::new(0.6, 0.2, 0.2),
        ],
        protective: vec![0],
        priority: vec![0],
        ..CatalogConfig::default()
    };
    let catalog = ActionCatalog::new(config, 100.0);
    assert_eq!(catalog.nearest_index(&Allocation::new(0.5, 0.3, 0.2)), 0);
    assert_eq!(catalog.nearest_index(&Allocation::new(0.6, 0.2, 0.2)), 0);
}

#[test]
fn test_congestion_drops_splits_handing_one_class_the_link() {
    let config = CatalogConfig {
        entries: vec![
            Allocation::new(0.34, 0.33, 0.33),
            Allocation::new(0.95, 0.025, 0.025),
            Allocation::new(0.6, 0.2, 0.2),
            Allocation::new(0.025, 0.95, 0.025),
        ],
        protective: vec![0],
        priority: vec![0],
        ..CatalogConfig::default()
    };
    let catalog = ActionCatalog::new(config, 100.0);

    let web_overloaded = state((30, 200.0, 50.0), (0, 0.0, 0.0), (0, 0.0, 0.0));
    assert_eq!(catalog.valid_indices(&web_overloaded), vec![0, 2]);

    let moderate = state((10, 60.0, 80.0), (10, 50.0, 80.0), (0, 0.0, 0.0));
    assert_eq!(catalog.valid_indices(&moderate), vec![0, 2]);

    let calm = state((10, 30.0, 100.0), (10, 20.0, 100.0), (0, 0.0, 0.0));
    assert_eq!(catalog.valid_indices(&calm).len(), 4);
}
