//! A construction site built from the settlement's own stock.

#![allow(clippy::unwrap_used)]

use marsim_types::{Part, Resource};
use marsim_world::{BuildingCatalog, ConstructionCatalog, Settlement};

fn stocked_settlement(buildings: &BuildingCatalog) -> Settlement {
    let mut settlement = Settlement::new("Base");
    settlement.add_building("Lander Hab", buildings).unwrap();
    settlement.add_building("Storage Shed", buildings).unwrap();
    for (part, count) in [
        (Part::SteelBeam, 8),
        (Part::SteelPanel, 4),
        (Part::AluminumSheet, 6),
        (Part::Window, 2),
    ] {
        settlement.inventory.store_parts(part, count).unwrap();
    }
    settlement
}

#[test]
fn site_is_built_stage_by_stage_from_settlement_stock() {
    let buildings = BuildingCatalog::default();
    let stages = ConstructionCatalog::default();
    let mut settlement = stocked_settlement(&buildings);
    let concrete_before = settlement.inventory.stored(Resource::Concrete);

    let site_id = settlement.create_site();
    let mut next = stages.foundations().next().cloned();
    while let Some(info) = next {
        let name = info.name.clone();
        let mut inventory = settlement.inventory.clone();
        let site = settlement.site_mut(site_id).unwrap();
        site.add_stage(info).unwrap();
        let stage = site.current_stage_mut().unwrap();
        assert!(stage.load_materials(&mut inventory), "materials for {name}");
        while !stage.add_work(40.0) {}
        settlement.inventory = inventory;
        next = stages.next_stages(&name).next().cloned();
    }

    assert!(settlement.site(site_id).unwrap().is_all_construction_complete());
    settlement.complete_site(site_id, &buildings).unwrap();

    let sheds = settlement
        .buildings()
        .iter()
        .filter(|building| building.building_type == "Storage Shed")
        .count();
    assert_eq!(sheds, 2);
    // 300 kg went into the site; the new shed arrives with its own 800 kg.
    let expected = concrete_before - 300.0 + 800.0;
    assert!((settlement.inventory.stored(Resource::Concrete) - expected).abs() < 1e-6);
    assert_eq!(settlement.inventory.part_count(Part::SteelBeam), 0);
    assert_eq!(settlement.inventory.part_count(Part::Window), 0);
}

#[test]
fn site_without_materials_stays_unloaded() {
    let buildings = BuildingCatalog::default();
    let stages = ConstructionCatalog::default();
    let mut settlement = Settlement::new("Outpost");
    settlement.add_building("Lander Hab", &buildings).unwrap();
    let mut inventory = settlement.inventory.clone();

    let site_id = settlement.create_site();
    let site = settlement.site_mut(site_id).unwrap();
    site.add_stage(stages.stage("Surface Foundation").cloned().unwrap()).unwrap();
    let stage = site.current_stage_mut().unwrap();
    assert!(!stage.load_materials(&mut inventory));
    assert!(!stage.materials_loaded());
}
