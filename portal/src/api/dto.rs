use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::app_user::{self, Role, Status};
use crate::provisioning::{
    AgentOverview, ApartmentDescriptor, ApartmentDetail, ApartmentRecord, IssuedCredential,
    OwnerName, ProvisionedApartment,
};

// ---------- auth ----------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize, Clone)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: Option<String>,
    pub role: Role,
    pub status: Status,
    pub apartment_id: Option<Uuid>,
    pub last_login_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<app_user::Model> for UserResponse {
    fn from(m: app_user::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            username: m.username,
            email: m.email,
            role: m.role,
            status: m.status,
            apartment_id: m.apartment_id,
            last_login_at: m.last_login_at,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

// ---------- apartment requests ----------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerNameRequest {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ProvisionApartmentRequest {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(rename = "type", default)]
    pub apartment_type: String,
    #[serde(default)]
    pub owners: Vec<OwnerNameRequest>,
}

impl ProvisionApartmentRequest {
    pub fn into_parts(self) -> (ApartmentDescriptor, Vec<OwnerName>) {
        let descriptor = ApartmentDescriptor {
            name: self.name,
            address: self.address,
            apartment_type: self.apartment_type,
        };
        let owners = self
            .owners
            .into_iter()
            .map(|o| OwnerName {
                first_name: o.first_name,
                last_name: o.last_name,
            })
            .collect();
        (descriptor, owners)
    }
}

#[derive(Debug, Deserialize)]
pub struct EditApartmentRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ListApartmentsQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub search: Option<String>,
}

// ---------- apartment responses ----------

#[derive(Debug, Serialize)]
pub struct ApartmentResponse {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub address: String,
    #[serde(rename = "type")]
    pub apartment_type: String,
    pub agent_id: Uuid,
    pub owners: Vec<Uuid>,
    pub residents: Vec<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<ApartmentRecord> for ApartmentResponse {
    fn from(r: ApartmentRecord) -> Self {
        let a = r.apartment;
        Self {
            id: a.id,
            code: a.code,
            name: a.name,
            address: a.address,
            apartment_type: a.apartment_type,
            agent_id: a.agent_id,
            owners: r.owner_ids,
            residents: r.resident_ids,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

/// 201 body of `POST /apartments`; the only response that carries passwords.
#[derive(Debug, Serialize)]
pub struct ProvisionApartmentResponse {
    pub apartment: ApartmentResponse,
    pub owners: Vec<IssuedCredential>,
}

impl From<ProvisionedApartment> for ProvisionApartmentResponse {
    fn from(p: ProvisionedApartment) -> Self {
        Self {
            apartment: ApartmentResponse::from(p.apartment),
            owners: p.owners,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: Option<String>,
    pub status: Status,
}

impl From<app_user::Model> for MemberResponse {
    fn from(m: app_user::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            username: m.username,
            email: m.email,
            status: m.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApartmentDetailResponse {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub address: String,
    #[serde(rename = "type")]
    pub apartment_type: String,
    pub agent_id: Uuid,
    pub owners: Vec<MemberResponse>,
    pub residents: Vec<MemberResponse>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<ApartmentDetail> for ApartmentDetailResponse {
    fn from(d: ApartmentDetail) -> Self {
        let a = d.apartment;
        Self {
            id: a.id,
            code: a.code,
            name: a.name,
            address: a.address,
            apartment_type: a.apartment_type,
            agent_id: a.agent_id,
            owners: d.owners.into_iter().map(MemberResponse::from).collect(),
            residents: d.residents.into_iter().map(MemberResponse::from).collect(),
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

// ---------- supervisor ----------

#[derive(Debug, Serialize)]
pub struct AgentResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub prefix: String,
    pub last_issued_code: Option<String>,
    pub apartment_count: u64,
    pub created_at: NaiveDateTime,
}

impl From<AgentOverview> for AgentResponse {
    fn from(o: AgentOverview) -> Self {
        Self {
            id: o.agent.id,
            user_id: o.agent.user_id,
            name: o.name,
            email: o.agent.email,
            prefix: o.agent.prefix,
            last_issued_code: o.agent.last_issued_code,
            apartment_count: o.apartment_count,
            created_at: o.agent.created_at,
        }
    }
}
