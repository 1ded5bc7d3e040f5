use crate::{
    client::ApiClient,
    endpoint::{Endpoint, Resource},
    error::{ApiError, Result},
};
use parking_lot::Mutex;
use pulse_common::{
    model::{
        Id, ModelValidationError,
        goal::{CreateGoal, Goal, GoalMarker, validate_current, validate_target},
    },
    provisional::ProvisionalIdGenerator,
};
use pulse_sync::{FailurePolicy, Snapshot, SyncStore};

fn invalid(err: impl Into<ModelValidationError>) -> ApiError {
    ApiError::Validation(err.into().to_string())
}

/// The signed-in user's goals, edited optimistically.
#[derive(Debug)]
pub struct Goals {
    store: SyncStore<ApiClient>,
    ids: Mutex<ProvisionalIdGenerator>,
    policy: FailurePolicy,
}

impl Goals {
    #[must_use]
    pub fn new(store: SyncStore<ApiClient>, policy: FailurePolicy) -> Self {
        Self {
            store,
            ids: Mutex::new(ProvisionalIdGenerator::new()),
            policy,
        }
    }

    pub fn read(&self) -> Snapshot<Resource> {
        self.store.read(&Endpoint::Goals)
    }

    pub async fn create(&self, goal: CreateGoal) -> Result<Goal> {
        let target = validate_target(goal.target).map_err(invalid)?;
        let provisional = Goal {
            id: self.ids.lock().generate(),
            category: goal.category,
            metric: goal.metric,
            current: 0.0,
            target,
            end_date: goal.end_date,
        };
        let provisional_id = provisional.id;

        self.store
            .optimistic()
            .policy(self.policy)
            .patch(
                Endpoint::Goals,
                move |resource| {
                    if let Some(goals) = resource.goals_mut() {
                        goals.push(provisional);
                    }
                },
                move |resource| {
                    if let Some(goals) = resource.goals_mut() {
                        goals.retain(|goal| goal.id != provisional_id);
                    }
                },
            )
            .run(self.store.fetcher().create_goal(&goal))
            .await
    }

    pub async fn update_progress(&self, goal_id: Id<GoalMarker>, current: f64) -> Result<Goal> {
        let current = validate_current(current).map_err(invalid)?;
        let previous = self.store.get(&Endpoint::Goals).value.and_then(|resource| {
            resource
                .goals()?
                .iter()
                .find(|goal| goal.id == goal_id)
                .map(|goal| goal.current)
        });

        let set_to = move |value: f64| {
            move |resource: &mut Resource| {
                let goal = resource
                    .goals_mut()
                    .and_then(|goals| goals.iter_mut().find(|goal| goal.id == goal_id));
                if let Some(goal) = goal {
                    goal.current = value;
                }
            }
        };

        self.store
            .optimistic()
            .policy(self.policy)
            .patch(
                Endpoint::Goals,
                set_to(current),
                set_to(previous.unwrap_or(current)),
            )
            .run(self.store.fetcher().update_goal_progress(goal_id, current))
            .await
    }

    pub async fn delete(&self, ids: Vec<Id<GoalMarker>>) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        // Positions in ascending order, so reinserting in order restores them.
        let removed: Vec<(usize, Goal)> = self
            .store
            .get(&Endpoint::Goals)
            .value
            .and_then(|resource| {
                let goals = resource.goals()?;
                Some(
                    goals
                        .iter()
                        .enumerate()
                        .filter(|(_, goal)| ids.contains(&goal.id))
                        .map(|(index, goal)| (index, goal.clone()))
                        .collect(),
                )
            })
            .unwrap_or_default();

        let remove = {
            let ids = ids.clone();
            move |resource: &mut Resource| {
                if let Some(goals) = resource.goals_mut() {
                    goals.retain(|goal| !ids.contains(&goal.id));
                }
            }
        };

        self.store
            .optimistic()
            .policy(self.policy)
            .patch(Endpoint::Goals, remove, move |resource| {
                if let Some(goals) = resource.goals_mut() {
                    for (index, goal) in removed {
                        let index = index.min(goals.len());
                        goals.insert(index, goal);
                    }
                }
            })
            .run(self.store.fetcher().delete_goals(&ids))
            .await
    }
}
