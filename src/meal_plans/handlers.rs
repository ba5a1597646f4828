use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{
    GenerateMealPlanRequest, GeneratedMealPlanResponse, MealPlanListItem, MealPlanListQuery,
    MealPlanResponse,
};
use super::generator::{GenerationRequest, MealPlanGenerator};
use crate::{
    constraints::ConstraintResolver,
    error::{reject, PlannerError},
    state::AppState,
};

const MAX_PAGE: i64 = 100;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/meal-plans", get(list_meal_plans))
        .route("/meal-plans/:id", get(get_meal_plan))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/meal-plans/generate", post(generate_meal_plan))
        .route("/meal-plans/:id", delete(delete_meal_plan))
}

/// POST /meal-plans/generate
#[instrument(skip(state, body), fields(user_id = %body.user_id, num_days = body.num_days))]
pub async fn generate_meal_plan(
    State(state): State<AppState>,
    Json(body): Json<GenerateMealPlanRequest>,
) -> Result<(StatusCode, HeaderMap, Json<GeneratedMealPlanResponse>), (StatusCode, String)> {
    let profile = state
        .store
        .load_profile(body.user_id)
        .await
        .map_err(reject)?
        .ok_or_else(|| {
            reject(PlannerError::InvalidRequest(format!(
                "user {} has no profile",
                body.user_id
            )))
        })?;
    let catalog = state.store.load_catalog().await.map_err(reject)?;
    let constraints = state
        .store
        .load_constraints(body.user_id)
        .await
        .map_err(reject)?;
    let admissible = ConstraintResolver::new(&catalog, &constraints)
        .map_err(reject)?
        .admissible();

    let generator = MealPlanGenerator::new(state.config.planner.clone());
    let seed = body.seed.unwrap_or(state.config.plan_seed);
    let generated = tokio::task::spawn_blocking(move || {
        generator.generate(&GenerationRequest {
            user_id: body.user_id,
            targets: &profile.targets,
            foods: &admissible,
            num_days: body.num_days,
            start_date: body.start_date,
            seed,
        })
    })
    .await
    .map_err(|e| reject(anyhow::Error::new(e).context("meal plan generation task")))?
    .map_err(reject)?;

    state
        .store
        .save_meal_plan(&generated.plan)
        .await
        .map_err(reject)?;

    info!(
        meal_plan_id = %generated.plan.id,
        meals = generated.plan.meals.len(),
        termination = ?generated.fit.termination,
        "meal plan stored"
    );

    let mut headers = HeaderMap::new();
    let location = HeaderValue::from_str(&format!("/api/v1/meal-plans/{}", generated.plan.id))
        .map_err(|e| reject(anyhow::Error::new(e)))?;
    headers.insert(header::LOCATION, location);

    Ok((
        StatusCode::CREATED,
        headers,
        Json(GeneratedMealPlanResponse {
            meal_plan: MealPlanResponse::from(&generated.plan),
            fit: generated.fit,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_meal_plans(
    State(state): State<AppState>,
    Query(q): Query<MealPlanListQuery>,
) -> Result<Json<Vec<MealPlanListItem>>, (StatusCode, String)> {
    if !(1..=MAX_PAGE).contains(&q.limit) || q.offset < 0 {
        return Err(reject(PlannerError::InvalidRequest(format!(
            "limit must be 1..={MAX_PAGE} and offset non-negative"
        ))));
    }
    let rows = state
        .store
        .list_meal_plans(q.user_id, q.limit, q.offset)
        .await
        .map_err(reject)?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state))]
pub async fn get_meal_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MealPlanResponse>, (StatusCode, String)> {
    let plan = state
        .store
        .load_meal_plan(id)
        .await
        .map_err(reject)?
        .ok_or_else(|| reject(PlannerError::NotFound(format!("meal plan {id}"))))?;
    Ok(Json(MealPlanResponse::from(&plan)))
}

/// DELETE /meal-plans/:id, meals go with it.
#[instrument(skip(state))]
pub async fn delete_meal_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if state.store.delete_meal_plan(id).await.map_err(reject)? {
        info!(meal_plan_id = %id, "meal plan deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(reject(PlannerError::NotFound(format!("meal plan {id}"))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{UserConstraints, UserFoodDislike};
    use crate::profiles::dto::ProfileInput;
    use crate::profiles::repo_types::{ActivityLevel, Gender, WeightGoal};
    use crate::profiles::services::derive_profile;
    use crate::storage::{MemoryStore, PlannerStore};
    use std::sync::Arc;
    use time::OffsetDateTime;

    async fn state_with_profile(user_id: Uuid) -> (AppState, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::seeded());
        let input = ProfileInput {
            age: Some(30),
            gender: Some(Gender::Male),
            height: Some(70.0),
            weight: Some(175.0),
            activity_level: Some(ActivityLevel::ModeratelyActive),
            weight_goal_type: WeightGoal::Maintain,
            goal_weight: None,
            weight_change_per_week: None,
        };
        let profile = derive_profile(user_id, &input, OffsetDateTime::now_utc()).unwrap();
        store.save_profile(&profile).await.unwrap();
        (AppState::with_store(store.clone()), store)
    }

    fn generate_body(user_id: Uuid, num_days: i64) -> GenerateMealPlanRequest {
        GenerateMealPlanRequest {
            user_id,
            num_days,
            start_date: None,
            seed: Some(17),
        }
    }

    #[tokio::test]
    async fn generate_store_fetch_delete() {
        let user_id = Uuid::new_v4();
        let (state, _) = state_with_profile(user_id).await;

        let (status, headers, Json(created)) =
            generate_meal_plan(State(state.clone()), Json(generate_body(user_id, 2)))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        let plan_id = created.meal_plan.id;
        assert_eq!(
            headers.get(header::LOCATION).unwrap(),
            &format!("/api/v1/meal-plans/{plan_id}")
        );
        assert_eq!(created.meal_plan.meals.len(), 6);
        assert!(created.fit.calories_within);

        let Json(fetched) = get_meal_plan(State(state.clone()), Path(plan_id))
            .await
            .unwrap();
        assert_eq!(fetched.meals.len(), 6);
        assert!(fetched
            .total_nutrition
            .approx_eq(&created.meal_plan.total_nutrition, 1e-6));

        let Json(listed) = list_meal_plans(
            State(state.clone()),
            Query(MealPlanListQuery {
                user_id,
                limit: 20,
                offset: 0,
            }),
        )
        .await
        .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].meal_count, 6);

        let status = delete_meal_plan(State(state.clone()), Path(plan_id))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = get_meal_plan(State(state.clone()), Path(plan_id))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = delete_meal_plan(State(state), Path(plan_id))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_profile_is_bad_request() {
        let state = AppState::fake();
        let (status, body) =
            generate_meal_plan(State(state), Json(generate_body(Uuid::new_v4(), 1)))
                .await
                .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("no profile"));
    }

    #[tokio::test]
    async fn too_many_days_is_bad_request() {
        let user_id = Uuid::new_v4();
        let (state, _) = state_with_profile(user_id).await;
        for days in [31, 0, -3] {
            let (status, body) =
                generate_meal_plan(State(state.clone()), Json(generate_body(user_id, days)))
                    .await
                    .unwrap_err();
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(body.contains("num_days"), "{body}");
        }
    }

    #[tokio::test]
    async fn protein_free_options_are_rejected_and_not_stored() {
        let user_id = Uuid::new_v4();
        let (state, store) = state_with_profile(user_id).await;
        let dislikes = (1..=20)
            .filter(|food_id| *food_id != 18)
            .map(|food_id| UserFoodDislike {
                food_id,
                reason: None,
            })
            .collect();
        store
            .put_constraints(
                user_id,
                UserConstraints {
                    dislikes,
                    ..Default::default()
                },
            )
            .await;

        let (status, body) =
            generate_meal_plan(State(state.clone()), Json(generate_body(user_id, 1)))
                .await
                .unwrap_err();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.contains("protein"), "{body}");
        let rows = store.list_meal_plans(user_id, 20, 0).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn disliking_everything_leaves_no_options() {
        let user_id = Uuid::new_v4();
        let (state, store) = state_with_profile(user_id).await;
        let dislikes = (1..=20)
            .map(|food_id| UserFoodDislike {
                food_id,
                reason: None,
            })
            .collect();
        store
            .put_constraints(
                user_id,
                UserConstraints {
                    dislikes,
                    ..Default::default()
                },
            )
            .await;

        let (status, body) = generate_meal_plan(State(state), Json(generate_body(user_id, 1)))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.contains("breakfast"));
    }

    #[tokio::test]
    async fn listing_rejects_oversized_pages() {
        let state = AppState::fake();
        let (status, _) = list_meal_plans(
            State(state),
            Query(MealPlanListQuery {
                user_id: Uuid::new_v4(),
                limit: 1000,
                offset: 0,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
