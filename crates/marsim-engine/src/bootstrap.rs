//! Settlement bootstrap: founding settlements from configured templates.
//!
//! For each [`SettlementTemplate`] the bootstrap erects the buildings in
//! order (which installs their storage and starting stock), adds extra
//! resources and parts, parks the vehicles, and creates the named crew,
//! generated colonists, and robots. Every agent joins the settlement roster
//! in that order, which is also the order they act in.

use marsim_agents::{AgentError, AgentManager, AgentSeed};
use marsim_core::SimulationContext;
use marsim_core::config::SettlementTemplate;
use marsim_types::{RoleType, SettlementId};
use marsim_world::{Settlement, Vehicle};
use rand::Rng;
use tracing::{info, warn};

use crate::error::EngineError;

// -----------------------------------------------------------------------
// Name pool
// -----------------------------------------------------------------------

/// Built-in pool of colonist names. Names are drawn at random without
/// replacement; names already taken by the crew are skipped.
const NAME_POOL: &[&str] = &[
    "Abebe Tesfaye", "Amara Okonkwo", "Anika Patel", "Arjun Mehta", "Beatriz Lima",
    "Bo-ra Kim", "Camille Durand", "Chen Wei", "Dmitri Volkov", "Elif Yilmaz",
    "Emeka Eze", "Farah Haddad", "Freya Nilsson", "Hana Suzuki", "Ilya Petrov",
    "Isabel Ortega", "Jonas Weber", "Kai Nakamura", "Kavya Rao", "Lars Berg",
    "Leila Karimi", "Lucia Romano", "Mateo Silva", "Mei Lin", "Nadia Rahman",
    "Nikolai Ivanov", "Noa Levi", "Oskar Lund", "Priya Nair", "Rafael Costa",
    "Sana Malik", "Sofia Rossi", "Tariq Aziz", "Thandiwe Dube", "Yara Haddad",
    "Yuki Tanaka", "Zainab Bello", "Zofia Nowak",
];

/// Roles handed to generated colonists, in rotation.
const COLONIST_ROLES: [RoleType; 4] = [
    RoleType::CrewEngineer,
    RoleType::CrewScientist,
    RoleType::CrewOperationOfficer,
    RoleType::CrewHealthAndSafety,
];

// -----------------------------------------------------------------------
// Bootstrap result
// -----------------------------------------------------------------------

/// What the bootstrap created.
#[derive(Debug, Default)]
pub struct BootstrapResult {
    /// Settlements in template order.
    pub settlements: Vec<SettlementId>,
    /// People created, crew and colonists.
    pub people: usize,
    /// Robots created.
    pub robots: usize,
    /// Vehicles parked.
    pub vehicles: usize,
}

/// Found every templated settlement in `ctx`.
///
/// # Errors
///
/// Returns [`EngineError`] if a building type is unknown, stock cannot be
/// stored, an agent cannot be created, or the name pool runs out.
pub fn found_settlements(
    ctx: &mut SimulationContext,
    templates: &[SettlementTemplate],
) -> Result<BootstrapResult, EngineError> {
    let mut manager = AgentManager::new();
    let mut result = BootstrapResult::default();
    let mut pool = shuffled_pool(&mut ctx.rng);

    for template in templates {
        let id = found_settlement(ctx, template)?;
        result.settlements.push(id);
        result.vehicles = result.vehicles.saturating_add(template.vehicles.len());

        let sol = ctx.clock.mars_time().total_sols();
        for seed in &template.crew {
            let agent = manager.create_person(seed, id, sol, &mut ctx.rng)?;
            ctx.add_agent(agent)?;
            result.people = result.people.saturating_add(1);
        }
        for (role, _) in COLONIST_ROLES.iter().cycle().zip(0..template.colonists) {
            let agent = create_colonist(&mut manager, &mut pool, *role, id, sol, ctx)?;
            ctx.add_agent(agent)?;
            result.people = result.people.saturating_add(1);
        }
        for robot in &template.robots {
            let agent = manager.create_robot(&robot.name, robot.job, id, sol)?;
            ctx.add_agent(agent)?;
            result.robots = result.robots.saturating_add(1);
        }

        let population = ctx
            .world
            .settlement(id)
            .map_or(0, Settlement::population);
        info!(settlement = %template.name, %id, population, "settlement founded");
    }
    Ok(result)
}

/// Buildings, stock, parts, and vehicles of one template.
fn found_settlement(
    ctx: &mut SimulationContext,
    template: &SettlementTemplate,
) -> Result<SettlementId, EngineError> {
    let mut settlement = Settlement::new(template.name.clone());
    for building in &template.buildings {
        settlement.add_building(building, &ctx.rules.buildings)?;
    }
    for (resource, amount) in &template.resources {
        let stored = settlement.inventory.store(*resource, *amount)?;
        if stored < *amount {
            warn!(
                settlement = %template.name,
                %resource,
                requested = *amount,
                stored,
                "not enough storage for starting stock"
            );
        }
    }
    for (part, count) in &template.parts {
        settlement.inventory.store_parts(*part, *count)?;
    }

    let id = ctx.add_settlement(settlement);
    for vehicle in &template.vehicles {
        ctx.world
            .add_vehicle(Vehicle::new(vehicle.name.clone(), vehicle.kind, Some(id)));
    }
    Ok(id)
}

/// Create a person from the next unused pool name.
fn create_colonist(
    manager: &mut AgentManager,
    pool: &mut Vec<&'static str>,
    role: RoleType,
    settlement: SettlementId,
    sol: u64,
    ctx: &mut SimulationContext,
) -> Result<marsim_agents::Agent, EngineError> {
    while let Some(name) = pool.pop() {
        let seed = AgentSeed {
            name: name.to_owned(),
            role,
            job: None,
        };
        match manager.create_person(&seed, settlement, sol, &mut ctx.rng) {
            Ok(agent) => return Ok(agent),
            // Taken by a named crew member.
            Err(AgentError::DuplicateName(_)) => {}
            Err(err) => return Err(err.into()),
        }
    }
    Err(EngineError::Bootstrap {
        message: format!("name pool of {} colonist names is exhausted", NAME_POOL.len()),
    })
}

/// The name pool in random order, drawn from the back.
fn shuffled_pool<R: Rng>(rng: &mut R) -> Vec<&'static str> {
    // Fisher-Yates from the front.
    let mut names: Vec<&'static str> = NAME_POOL.to_vec();
    let len = names.len();
    for i in 0..len {
        let j = rng.random_range(i..len);
        names.swap(i, j);
    }
    names
}
