use std::collections::HashMap;

use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    sea_query::Expr,
};
use uuid::Uuid;

use super::{
    ApartmentRecord, ApartmentService, Principal, ProvisionError, load_record, owned_apartment,
    resolve_agent,
};
use crate::entity::{agent, apartment, apartment_owner, apartment_resident, app_user};

/// An apartment with its owners and residents resolved to identities.
#[derive(Debug, Clone)]
pub struct ApartmentDetail {
    pub apartment: apartment::Model,
    pub owners: Vec<app_user::Model>,
    pub residents: Vec<app_user::Model>,
}

/// One row of the supervisor's agent overview.
#[derive(Debug, Clone)]
pub struct AgentOverview {
    pub agent: agent::Model,
    pub name: String,
    pub apartment_count: u64,
}

impl ApartmentService {
    /// The caller's apartments in creation order, one page at a time.
    /// `page` is 1-based. Returns the page and the total number of matches.
    pub async fn list_apartments(
        &self,
        principal: &Principal,
        page: u64,
        page_size: u64,
        search: Option<&str>,
    ) -> Result<(Vec<ApartmentRecord>, u64), ProvisionError> {
        let agent = resolve_agent(&self.db, principal).await?;

        let mut query = apartment::Entity::find().filter(apartment::Column::AgentId.eq(agent.id));
        if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(apartment::Column::Name.contains(search))
                    .add(apartment::Column::Code.contains(search)),
            );
        }

        let paginator = query
            .order_by_asc(apartment::Column::CreatedAt)
            .order_by_asc(apartment::Column::Id)
            .paginate(&self.db, page_size.max(1));
        let total = paginator.num_items().await?;
        let apartments = paginator.fetch_page(page.max(1) - 1).await?;

        let mut records = Vec::with_capacity(apartments.len());
        for apartment in apartments {
            records.push(load_record(&self.db, apartment).await?);
        }
        Ok((records, total))
    }

    pub async fn get_apartment(
        &self,
        principal: &Principal,
        apartment_id: Uuid,
    ) -> Result<ApartmentDetail, ProvisionError> {
        let agent = resolve_agent(&self.db, principal).await?;
        let apartment = owned_apartment(&self.db, &agent, apartment_id).await?;

        let owners = apartment_owner::Entity::find()
            .filter(apartment_owner::Column::ApartmentId.eq(apartment.id))
            .order_by_asc(apartment_owner::Column::CreatedAt)
            .order_by_asc(apartment_owner::Column::Id)
            .find_also_related(app_user::Entity)
            .all(&self.db)
            .await?
            .into_iter()
            .filter_map(|(_, user)| user)
            .collect();

        let residents = apartment_resident::Entity::find()
            .filter(apartment_resident::Column::ApartmentId.eq(apartment.id))
            .order_by_asc(apartment_resident::Column::CreatedAt)
            .order_by_asc(apartment_resident::Column::Id)
            .find_also_related(app_user::Entity)
            .all(&self.db)
            .await?
            .into_iter()
            .filter_map(|(_, user)| user)
            .collect();

        Ok(ApartmentDetail {
            apartment,
            owners,
            residents,
        })
    }

    /// Every agent with its apartment count, oldest agent first. Two
    /// queries regardless of the number of agents.
    pub async fn list_agents(&self) -> Result<Vec<AgentOverview>, ProvisionError> {
        let agents = agent::Entity::find()
            .order_by_asc(agent::Column::CreatedAt)
            .order_by_asc(agent::Column::Id)
            .find_also_related(app_user::Entity)
            .all(&self.db)
            .await?;

        let counts: HashMap<Uuid, i64> = apartment::Entity::find()
            .select_only()
            .column(apartment::Column::AgentId)
            .column_as(Expr::col(apartment::Column::Id).count(), "apartment_count")
            .group_by(apartment::Column::AgentId)
            .into_tuple::<(Uuid, i64)>()
            .all(&self.db)
            .await?
            .into_iter()
            .collect();

        Ok(agents
            .into_iter()
            .map(|(agent, user)| AgentOverview {
                name: user.map(|u| u.name).unwrap_or_default(),
                apartment_count: counts.get(&agent.id).map_or(0, |&n| n as u64),
                agent,
            })
            .collect())
    }
}
