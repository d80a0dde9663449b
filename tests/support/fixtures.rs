use std::sync::Arc;

use augur::adapter::outbound::crypto::ApiKeyCipher;
use augur::application::{ChatSettings, Services};
use augur::domain::context::{RequestContext, Role};
use augur::domain::forecast::{DataType, Forecast, ForecastType};
use augur::domain::group::{CreateGroupInput, Group};
use augur::domain::id::{ForecastId, OrganizationId};
use augur::domain::organization::{Organization, OrganizationSettingsInput, User};
use augur::port::outbound::store::Store;
use chrono::{DateTime, Duration, Utc};

use super::scripted_model::ScriptedFactory;
use super::temp_db::TempDb;

pub const TEST_ENCRYPTION_KEY: &str = "0123456789abcdef0123456789abcdef";
pub const TEST_API_KEY: &str = "sk-test-0123456789";

/// Services over a fresh database with a scripted chat model.
pub struct World {
    pub db: TempDb,
    pub store: Arc<dyn Store>,
    pub services: Services,
    pub models: Arc<ScriptedFactory>,
}

impl World {
    pub fn new() -> Self {
        Self::with_chat(ChatSettings::default())
    }

    pub fn with_chat(settings: ChatSettings) -> Self {
        let db = TempDb::create();
        let store = db.store();
        let cipher = Arc::new(ApiKeyCipher::new(TEST_ENCRYPTION_KEY).expect("cipher"));
        let models = Arc::new(ScriptedFactory::default());
        let services = Services::new(store.clone(), cipher, models.clone(), settings);
        Self {
            db,
            store,
            services,
            models,
        }
    }

    /// A new organization and the context of its administrator.
    pub async fn organization(&self, name: &str) -> (Organization, RequestContext) {
        let slug = name.to_lowercase().replace(' ', "-");
        let (organization, admin) = self
            .services
            .organizations
            .provision(
                OrganizationSettingsInput {
                    name: name.to_string(),
                    description: None,
                },
                &format!("admin@{slug}.test"),
                Some("Admin"),
            )
            .await
            .expect("provision organization");
        (organization, context(&admin))
    }

    /// A regular user of `organization`.
    pub async fn member(&self, organization: &OrganizationId, name: &str) -> RequestContext {
        let slug = name.to_lowercase().replace(' ', ".");
        let user = self
            .services
            .organizations
            .provision_user(
                organization,
                &format!("{slug}.{}@members.test", organization.as_str()),
                Some(name),
                Role::User,
            )
            .await
            .expect("provision user");
        context(&user)
    }

    pub async fn store_api_key(&self, admin: &RequestContext) {
        self.services
            .organizations
            .update_api_key(admin, TEST_API_KEY)
            .await
            .expect("store api key");
    }

    pub async fn group(&self, admin: &RequestContext, name: &str) -> Group {
        self.services
            .groups
            .create(
                admin,
                CreateGroupInput {
                    name: name.to_string(),
                    description: None,
                },
            )
            .await
            .expect("create group")
    }

    pub async fn join(&self, admin: &RequestContext, group: &Group, member: &RequestContext) {
        self.services
            .groups
            .add_member(admin, &group.id, member.user_id.as_str())
            .await
            .expect("add member");
    }

    /// Insert a forecast directly, bypassing the due-date rule.
    pub async fn forecast(
        &self,
        organization: &OrganizationId,
        title: &str,
        forecast_type: ForecastType,
        due: DateTime<Utc>,
    ) -> Forecast {
        let forecast = forecast(organization, title, forecast_type, due);
        self.store
            .create_forecast(&forecast)
            .await
            .expect("create forecast");
        forecast
    }
}

pub fn context(user: &User) -> RequestContext {
    RequestContext::new(user.id.clone(), user.organization_id.clone(), user.role)
}

pub fn in_days(days: i64) -> DateTime<Utc> {
    Utc::now() + Duration::days(days)
}

pub fn forecast(
    organization: &OrganizationId,
    title: &str,
    forecast_type: ForecastType,
    due: DateTime<Utc>,
) -> Forecast {
    Forecast {
        id: ForecastId::generate(),
        title: title.to_string(),
        description: None,
        forecast_type,
        data_type: (forecast_type == ForecastType::Continuous).then_some(DataType::Number),
        due_date: due,
        data_release_date: due + Duration::days(1),
        actual_value: None,
        organization_id: organization.clone(),
        category_id: None,
        options: (forecast_type == ForecastType::Categorical)
            .then(|| vec!["Red".to_string(), "Green".to_string(), "Blue".to_string()]),
        created_at: Utc::now(),
    }
}
