// src/engine/gate.rs

use crate::catalog::ModuleConfig;
use crate::error::AppError;
use crate::models::actor::Actor;
use crate::store::{EnrollmentStore, ProgressStore};

/// The two classes of protected resource, each with its own policy.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    /// Lesson/module pages: requires a matching active-or-completed
    /// enrollment.
    Content { module: &'a ModuleConfig },
    /// Module test pages: requires overall progress at or above the
    /// module's threshold.
    Assessment { module: &'a ModuleConfig },
}

/// The gate's verdict. `Deny` carries a short machine-readable reason that
/// is echoed to the user; it never carries resource data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { reason: &'static str },
}

/// Evaluates whether `actor` may view `resource`. Pure read: no side
/// effects on any store.
///
/// Instructors and admins always receive `Allow`. This is a deliberate
/// simplification of the three-role model, not least-privilege.
pub async fn authorize(
    actor: &Actor,
    resource: Resource<'_>,
    enrollments: &dyn EnrollmentStore,
    progress: &dyn ProgressStore,
) -> Result<Decision, AppError> {
    if actor.role.bypasses_gates() {
        return Ok(Decision::Allow);
    }

    match resource {
        Resource::Content { module } => {
            let matches = enrollments
                .active_enrollment_count(actor.id, &module.course_pattern)
                .await?;
            if matches > 0 {
                Ok(Decision::Allow)
            } else {
                Ok(Decision::Deny {
                    reason: "not_enrolled",
                })
            }
        }
        Resource::Assessment { module } => {
            let row = progress.get(actor.id, &module.module_id).await?;
            if row.overall_progress >= module.required_progress_percent {
                Ok(Decision::Allow)
            } else {
                Ok(Decision::Deny {
                    reason: "insufficient_progress",
                })
            }
        }
    }
}

/// Gate check that short-circuits the request on `Deny` by converting it
/// into the fixed access-denied error response.
pub async fn require(
    actor: &Actor,
    resource: Resource<'_>,
    enrollments: &dyn EnrollmentStore,
    progress: &dyn ProgressStore,
) -> Result<(), AppError> {
    match authorize(actor, resource, enrollments, progress).await? {
        Decision::Allow => Ok(()),
        Decision::Deny { reason } => {
            tracing::info!(
                user_id = actor.id,
                role = %actor.role,
                reason,
                "access denied"
            );
            Err(AppError::AuthorizationDenied {
                role: actor.role.to_string(),
                reason: reason.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ExamConfig, ModuleConfig};
    use crate::models::actor::Role;
    use crate::models::enrollment::Enrollment;
    use crate::store::MemoryStore;

    fn module() -> ModuleConfig {
        ModuleConfig {
            module_id: "web-foundations".to_string(),
            title: "Web Foundations".to_string(),
            course_pattern: "web development".to_string(),
            section_count: 4,
            required_progress_percent: 70.0,
            exam: ExamConfig::default(),
        }
    }

    fn actor(role: Role) -> Actor {
        Actor {
            id: 7,
            role,
            display_name: "Jess".to_string(),
        }
    }

    fn enrollment(status: &str) -> Enrollment {
        Enrollment {
            id: 1,
            student_id: 7,
            class_id: 3,
            status: status.to_string(),
            course_title: "Intro to Web Development".to_string(),
            program_name: "Engineering".to_string(),
            created_at: None,
        }
    }

    #[tokio::test]
    async fn staff_bypass_every_resource_class() {
        let store = MemoryStore::new();
        let m = module();

        for role in [Role::Instructor, Role::Admin] {
            let a = actor(role);
            for resource in [
                Resource::Content { module: &m },
                Resource::Assessment { module: &m },
            ] {
                let decision = authorize(&a, resource, &store, &store).await.unwrap();
                assert_eq!(decision, Decision::Allow);
            }
        }
    }

    #[tokio::test]
    async fn unenrolled_student_is_denied_content() {
        let store = MemoryStore::new();
        let m = module();
        let a = actor(Role::Student);

        let decision = authorize(&a, Resource::Content { module: &m }, &store, &store)
            .await
            .unwrap();
        assert_eq!(
            decision,
            Decision::Deny {
                reason: "not_enrolled"
            }
        );
    }

    #[tokio::test]
    async fn enrolled_student_is_allowed_content() {
        let store = MemoryStore::new();
        store.add_enrollment(enrollment("active"));
        let m = module();
        let a = actor(Role::Student);

        let decision = authorize(&a, Resource::Content { module: &m }, &store, &store)
            .await
            .unwrap();
        assert_eq!(decision, Decision::Allow);
    }

    #[tokio::test]
    async fn withdrawn_enrollment_does_not_count() {
        let store = MemoryStore::new();
        store.add_enrollment(enrollment("withdrawn"));
        let m = module();
        let a = actor(Role::Student);

        let decision = authorize(&a, Resource::Content { module: &m }, &store, &store)
            .await
            .unwrap();
        assert_eq!(
            decision,
            Decision::Deny {
                reason: "not_enrolled"
            }
        );
    }

    #[tokio::test]
    async fn assessment_gate_follows_progress_threshold() {
        let store = MemoryStore::new();
        let m = module();
        let a = actor(Role::Student);

        // 2 of 4 sections: 50%, below the 70% threshold.
        store.mark_section_complete(7, &m, 1).await.unwrap();
        store.mark_section_complete(7, &m, 2).await.unwrap();
        let decision = authorize(&a, Resource::Assessment { module: &m }, &store, &store)
            .await
            .unwrap();
        assert_eq!(
            decision,
            Decision::Deny {
                reason: "insufficient_progress"
            }
        );

        // 3 of 4: 75%, at or above threshold.
        store.mark_section_complete(7, &m, 3).await.unwrap();
        let decision = authorize(&a, Resource::Assessment { module: &m }, &store, &store)
            .await
            .unwrap();
        assert_eq!(decision, Decision::Allow);
    }

    #[tokio::test]
    async fn require_maps_deny_to_forbidden() {
        let store = MemoryStore::new();
        let m = module();
        let a = actor(Role::Student);

        let err = require(&a, Resource::Content { module: &m }, &store, &store)
            .await
            .unwrap_err();
        match err {
            AppError::AuthorizationDenied { role, reason } => {
                assert_eq!(role, "student");
                assert_eq!(reason, "not_enrolled");
            }
            other => panic!("expected AuthorizationDenied, got {:?}", other),
        }
    }
}
