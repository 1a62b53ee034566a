use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::route::Route;
use crate::utils::errors::{not_found_error, AppResult};

/// Almacenamiento de rutas
#[async_trait]
pub trait RouteRepository: Send + Sync {
    async fn insert(&self, route: Route) -> AppResult<Route>;
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Route>>;
    async fn list(&self) -> AppResult<Vec<Route>>;
    async fn list_by_vehicle(&self, vehicle_id: Uuid) -> AppResult<Vec<Route>>;
    async fn update(&self, route: Route) -> AppResult<Route>;
    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

#[derive(Default)]
pub struct InMemoryRouteRepository {
    routes: RwLock<HashMap<Uuid, Route>>,
}

impl InMemoryRouteRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted(mut routes: Vec<Route>) -> Vec<Route> {
        routes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        routes
    }
}

#[async_trait]
impl RouteRepository for InMemoryRouteRepository {
    async fn insert(&self, route: Route) -> AppResult<Route> {
        self.routes.write().insert(route.id, route.clone());
        Ok(route)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Route>> {
        Ok(self.routes.read().get(&id).cloned())
    }

    async fn list(&self) -> AppResult<Vec<Route>> {
        Ok(Self::sorted(self.routes.read().values().cloned().collect()))
    }

    async fn list_by_vehicle(&self, vehicle_id: Uuid) -> AppResult<Vec<Route>> {
        let routes = self
            .routes
            .read()
            .values()
            .filter(|r| r.vehicle_id == Some(vehicle_id))
            .cloned()
            .collect();
        Ok(Self::sorted(routes))
    }

    async fn update(&self, route: Route) -> AppResult<Route> {
        let mut routes = self.routes.write();
        match routes.get_mut(&route.id) {
            Some(slot) => {
                *slot = route.clone();
                Ok(route)
            }
            None => Err(not_found_error("Route", &route.id.to_string())),
        }
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.routes
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found_error("Route", &id.to_string()))
    }
}
