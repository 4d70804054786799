//! Jobs: assignment history, the reassignment workflow, task affinities,
//! and capability scores.
//!
//! # Reassignment
//!
//! A job change is filed as a [`JobAssignmentStatus::Pending`] record. A
//! reviewer (see [`RoleType::reviews_job_reassignments`]) later approves or
//! rejects it from their review task. Only an approved record changes the
//! active job; a rejected one stays in the history for display.
//!
//! [`RoleType::reviews_job_reassignments`]: marsim_types::RoleType::reviews_job_reassignments

use std::collections::BTreeMap;

use marsim_types::{AgentId, AgentKind, JobAssigner, JobAssignmentStatus, JobKind, NaturalAttribute, SkillType};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::attributes::NaturalAttributes;
use crate::condition::PhysicalCondition;
use crate::error::AgentError;
use crate::meta::MetaTaskKind;
use crate::skills::SkillManager;

/// One entry in an agent's job history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobAssignment {
    /// The job.
    pub job: JobKind,
    /// Who asked for it, as a display name.
    pub initiator: String,
    /// Where the request came from.
    pub assigner: JobAssigner,
    /// Review state.
    pub status: JobAssignmentStatus,
    /// Sol the request was filed.
    pub filed_sol: u64,
    /// Sol the request was decided, once it is.
    pub decided_sol: Option<u64>,
    /// Reviewer who decided it.
    pub reviewer: Option<AgentId>,
}

/// An agent's active job plus every assignment record, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHistory {
    active: JobKind,
    records: Vec<JobAssignment>,
}

impl JobHistory {
    /// Start a history with an initial, already approved job.
    pub fn new(job: JobKind, assigner: JobAssigner, sol: u64) -> Self {
        Self {
            active: job,
            records: vec![JobAssignment {
                job,
                initiator: "Settlement".to_owned(),
                assigner,
                status: JobAssignmentStatus::Approved,
                filed_sol: sol,
                decided_sol: Some(sol),
                reviewer: None,
            }],
        }
    }

    /// The job in effect.
    pub const fn active(&self) -> JobKind {
        self.active
    }

    /// Every record, oldest first.
    pub fn records(&self) -> &[JobAssignment] {
        &self.records
    }

    /// The latest record if it is still pending.
    pub fn pending(&self) -> Option<&JobAssignment> {
        self.records
            .last()
            .filter(|record| record.status == JobAssignmentStatus::Pending)
    }

    /// File a job-change request.
    pub fn request_change(
        &mut self,
        agent: AgentId,
        job: JobKind,
        initiator: impl Into<String>,
        assigner: JobAssigner,
        sol: u64,
    ) -> Result<(), AgentError> {
        if self.pending().is_some() {
            return Err(AgentError::RequestAlreadyPending { agent });
        }
        let initiator = initiator.into();
        info!(%agent, %job, %initiator, "job change requested");
        self.records.push(JobAssignment {
            job,
            initiator,
            assigner,
            status: JobAssignmentStatus::Pending,
            filed_sol: sol,
            decided_sol: None,
            reviewer: None,
        });
        Ok(())
    }

    /// Decide the pending request. Approval makes the job active.
    pub fn decide(
        &mut self,
        agent: AgentId,
        approve: bool,
        reviewer: AgentId,
        sol: u64,
    ) -> Result<JobAssignmentStatus, AgentError> {
        let record = self
            .records
            .last_mut()
            .filter(|record| record.status == JobAssignmentStatus::Pending)
            .ok_or(AgentError::NoPendingRequest { agent })?;
        record.status = if approve {
            JobAssignmentStatus::Approved
        } else {
            JobAssignmentStatus::Rejected
        };
        record.decided_sol = Some(sol);
        record.reviewer = Some(reviewer);
        if approve {
            self.active = record.job;
        }
        info!(%agent, job = %record.job, status = ?record.status, %reviewer, "job request decided");
        Ok(record.status)
    }
}

/// Per-job multipliers on task probabilities.
///
/// Missing entries are 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobAffinityTable {
    table: BTreeMap<JobKind, BTreeMap<MetaTaskKind, f64>>,
}

impl JobAffinityTable {
    /// Build a table from explicit entries.
    pub const fn new(table: BTreeMap<JobKind, BTreeMap<MetaTaskKind, f64>>) -> Self {
        Self { table }
    }

    /// Multiplier for a job doing a task kind. Never negative.
    pub fn affinity(&self, job: JobKind, task: MetaTaskKind) -> f64 {
        self.table
            .get(&job)
            .and_then(|tasks| tasks.get(&task))
            .copied()
            .unwrap_or(1.0)
            .max(0.0)
    }
}

impl Default for JobAffinityTable {
    fn default() -> Self {
        use MetaTaskKind::{DigLocalIce, MaintainGroundVehicle, UnloadVehicle};
        Self::new(BTreeMap::from([
            (JobKind::Areologist, BTreeMap::from([(DigLocalIce, 2.0)])),
            (JobKind::Engineer, BTreeMap::from([(MaintainGroundVehicle, 2.0)])),
            (JobKind::Technician, BTreeMap::from([(MaintainGroundVehicle, 1.5), (DigLocalIce, 1.2)])),
            (JobKind::Driver, BTreeMap::from([(UnloadVehicle, 2.0), (MaintainGroundVehicle, 1.2)])),
            (JobKind::Chef, BTreeMap::from([(DigLocalIce, 0.5)])),
            (JobKind::Doctor, BTreeMap::from([(DigLocalIce, 0.5)])),
            (JobKind::RepairBot, BTreeMap::from([(MaintainGroundVehicle, 2.0)])),
            (JobKind::DeliveryBot, BTreeMap::from([(UnloadVehicle, 2.0)])),
        ]))
    }
}

/// The skill a job mostly relies on.
pub const fn primary_skill(job: JobKind) -> SkillType {
    match job {
        JobKind::Architect | JobKind::ConstructionBot => SkillType::Construction,
        JobKind::Areologist => SkillType::Areology,
        JobKind::Botanist => SkillType::Botany,
        JobKind::Chef | JobKind::ChefBot => SkillType::Cooking,
        JobKind::Doctor => SkillType::Medicine,
        JobKind::Driver | JobKind::DeliveryBot => SkillType::Driving,
        JobKind::Engineer => SkillType::MaterialsScience,
        JobKind::Mathematician => SkillType::Mathematics,
        JobKind::Technician | JobKind::RepairBot => SkillType::Mechanics,
    }
}

/// The attribute that scales a job's capability.
pub const fn primary_aptitude(job: JobKind) -> NaturalAttribute {
    match job {
        JobKind::Architect
        | JobKind::Areologist
        | JobKind::Botanist
        | JobKind::Doctor
        | JobKind::Engineer
        | JobKind::Mathematician => NaturalAttribute::AcademicAptitude,
        JobKind::Chef
        | JobKind::Driver
        | JobKind::Technician
        | JobKind::ChefBot
        | JobKind::ConstructionBot
        | JobKind::DeliveryBot
        | JobKind::RepairBot => NaturalAttribute::ExperienceAptitude,
    }
}

/// How well an agent could do a job.
///
/// `skill + skill * (aptitude - 50) / 100`, or zero with a serious medical
/// problem.
pub fn job_capability(
    job: JobKind,
    skills: &SkillManager,
    attributes: &NaturalAttributes,
    condition: &PhysicalCondition,
) -> f64 {
    if condition.has_serious_medical_problem() {
        return 0.0;
    }
    let skill = f64::from(skills.skill_level(primary_skill(job)));
    skill + skill * attributes.modifier(primary_aptitude(job))
}

/// The most capable job for an agent kind. Ties go to the first listed.
pub fn best_job(
    kind: AgentKind,
    skills: &SkillManager,
    attributes: &NaturalAttributes,
    condition: &PhysicalCondition,
) -> JobKind {
    let jobs: &[JobKind] = match kind {
        AgentKind::Person => &JobKind::PERSON_JOBS,
        AgentKind::Robot => &JobKind::ROBOT_JOBS,
    };
    let mut best = match kind {
        AgentKind::Person => JobKind::Technician,
        AgentKind::Robot => JobKind::RepairBot,
    };
    let mut best_score = f64::NEG_INFINITY;
    for job in jobs {
        let score = job_capability(*job, skills, attributes, condition);
        if score > best_score {
            best = *job;
            best_score = score;
        }
    }
    best
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn history() -> (AgentId, JobHistory) {
        (AgentId::new(), JobHistory::new(JobKind::Technician, JobAssigner::Settlement, 1))
    }

    #[test]
    fn pending_request_does_not_change_job() {
        let (agent, mut jobs) = history();
        jobs.request_change(agent, JobKind::Areologist, "Ana", JobAssigner::User, 2)
            .unwrap();
        assert_eq!(jobs.active(), JobKind::Technician);
        assert_eq!(jobs.pending().unwrap().job, JobKind::Areologist);
    }

    #[test]
    fn approval_changes_the_active_job() {
        let (agent, mut jobs) = history();
        let reviewer = AgentId::new();
        jobs.request_change(agent, JobKind::Areologist, "Ana", JobAssigner::User, 2)
            .unwrap();
        let status = jobs.decide(agent, true, reviewer, 3).unwrap();
        assert_eq!(status, JobAssignmentStatus::Approved);
        assert_eq!(jobs.active(), JobKind::Areologist);
        let last = jobs.records().last().unwrap();
        assert_eq!(last.decided_sol, Some(3));
        assert_eq!(last.reviewer, Some(reviewer));
    }

    #[test]
    fn rejection_keeps_the_old_job() {
        let (agent, mut jobs) = history();
        jobs.request_change(agent, JobKind::Chef, "Ana", JobAssigner::MissionControl, 2)
            .unwrap();
        jobs.decide(agent, false, AgentId::new(), 2).unwrap();
        assert_eq!(jobs.active(), JobKind::Technician);
        assert_eq!(jobs.records().len(), 2);
        assert!(jobs.pending().is_none());
    }

    #[test]
    fn one_request_at_a_time() {
        let (agent, mut jobs) = history();
        jobs.request_change(agent, JobKind::Chef, "Ana", JobAssigner::User, 2)
            .unwrap();
        assert!(matches!(
            jobs.request_change(agent, JobKind::Doctor, "Ana", JobAssigner::User, 2),
            Err(AgentError::RequestAlreadyPending { .. })
        ));
        assert!(matches!(
            history().1.decide(agent, true, agent, 1),
            Err(AgentError::NoPendingRequest { .. })
        ));
    }

    #[test]
    fn capability_follows_skill_and_aptitude() {
        let mut skills = SkillManager::new();
        skills.set_skill_level(SkillType::Areology, 4);
        let mut attributes = NaturalAttributes::neutral();
        attributes.set(NaturalAttribute::AcademicAptitude, 100);
        let condition = PhysicalCondition::new();
        let capability = job_capability(JobKind::Areologist, &skills, &attributes, &condition);
        assert!((capability - 6.0).abs() < 1e-9);
        assert_eq!(
            best_job(AgentKind::Person, &skills, &attributes, &condition),
            JobKind::Areologist
        );

        let mut sick = PhysicalCondition::new();
        sick.set_medical_problem(Some("Fever".to_owned()));
        assert!(job_capability(JobKind::Areologist, &skills, &attributes, &sick).abs() < f64::EPSILON);
    }

    #[test]
    fn affinities_default_to_one() {
        let table = JobAffinityTable::default();
        assert!((table.affinity(JobKind::Botanist, MetaTaskKind::DigLocalIce) - 1.0).abs() < f64::EPSILON);
        assert!((table.affinity(JobKind::Areologist, MetaTaskKind::DigLocalIce) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn affinity_table_parses_from_yaml() {
        let yaml = "botanist:\n  dig_local_ice: 0.25\n";
        let table: JobAffinityTable = serde_yml::from_str(yaml).unwrap();
        assert!((table.affinity(JobKind::Botanist, MetaTaskKind::DigLocalIce) - 0.25).abs() < f64::EPSILON);
    }
}
