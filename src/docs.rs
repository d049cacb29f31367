// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,

        // --- Users ---
        handlers::auth::create_user,
        handlers::auth::get_me,
        handlers::auth::list_users,
        handlers::auth::update_user,
        handlers::auth::delete_user,
        handlers::auth::change_password,

        // --- ORDERS ---
        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::orders::create_order,
        handlers::orders::update_order,
        handlers::orders::delete_order,
        handlers::orders::assign_workers,
        handlers::orders::confirm_assignment,
        handlers::orders::set_picked_up,
        handlers::orders::save_recharge_date,
        handlers::orders::send_to_review,
        handlers::orders::finalize_review,
        handlers::orders::add_extinguisher,
        handlers::orders::update_extinguisher_cell,
        handlers::orders::delete_extinguisher,

        // --- PHOTOS ---
        handlers::photos::list_evidence_photos,
        handlers::photos::upload_evidence_photo,
        handlers::photos::delete_evidence_photo,
        handlers::photos::list_guide_photos,
        handlers::photos::upload_guide_photo,
        handlers::photos::delete_guide_photo,

        // --- Clients ---
        handlers::clients::list_clients,
        handlers::clients::get_client,
        handlers::clients::create_client,
        handlers::clients::update_client,
        handlers::clients::delete_client,

        // --- Catalog ---
        handlers::catalog::list_types,
        handlers::catalog::create_type,
        handlers::catalog::update_type,
        handlers::catalog::delete_type,
        handlers::catalog::list_capacities,
        handlers::catalog::create_capacity,
        handlers::catalog::update_capacity,
        handlers::catalog::delete_capacity,
        handlers::catalog::list_brands,
        handlers::catalog::create_brand,
        handlers::catalog::update_brand,
        handlers::catalog::delete_brand,

        // --- Extinguishers ---
        handlers::extinguishers::list_extinguishers,
        handlers::extinguishers::get_extinguisher,
        handlers::extinguishers::create_extinguisher,
        handlers::extinguishers::update_extinguisher,
        handlers::extinguishers::delete_extinguisher,

        // --- Dashboard ---
        handlers::dashboard::summary,

        // --- Maintenance ---
        handlers::maintenance::list_maintenance,
        handlers::maintenance::create_maintenance,

        // --- INVENTORY ---
        handlers::inventory::list_categories,
        handlers::inventory::create_category,
        handlers::inventory::list_products,
        handlers::inventory::create_product,
        handlers::inventory::list_movements,
        handlers::inventory::record_movement,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::Role,
            models::auth::User,
            models::auth::CreateUserPayload,
            models::auth::LoginUserPayload,
            models::auth::AuthResponse,
            models::auth::UpdateUserPayload,
            models::auth::ChangePasswordPayload,

            // --- Orders ---
            models::orders::OrderStage,
            models::orders::OrderStatus,
            models::orders::Order,
            models::orders::OrderLineDetail,
            models::orders::ExtinguisherRecord,
            models::orders::NewExtinguisher,
            models::orders::ExtinguisherField,
            models::orders::LineItemInput,
            models::orders::OrderSummary,
            models::orders::OrderDetail,
            models::orders::TransitionOutcome,
            models::orders::PickupOutcome,

            // --- Photos ---
            models::photos::PhotoKind,
            models::photos::Photo,

            // --- Clients ---
            models::clients::Client,
            models::clients::ClientPayload,

            // --- Catalog ---
            models::catalog::ExtinguisherType,
            models::catalog::ExtinguisherCapacity,
            models::catalog::ExtinguisherBrand,
            models::catalog::CreateTypePayload,
            models::catalog::CreateCapacityPayload,
            models::catalog::CreateBrandPayload,
            models::catalog::UpdateTypePayload,
            models::catalog::UpdateCapacityPayload,
            models::catalog::UpdateBrandPayload,

            // --- Extinguishers ---
            models::extinguishers::ExtinguisherView,
            models::extinguishers::CreateExtinguisherPayload,
            models::extinguishers::UpdateExtinguisherPayload,

            // --- Dashboard ---
            models::dashboard::DashboardSummary,

            // --- Maintenance ---
            models::maintenance::MaintenanceRecord,
            models::maintenance::CreateMaintenancePayload,

            // --- Inventory ---
            models::inventory::PartCategory,
            models::inventory::Product,
            models::inventory::ProductView,
            models::inventory::MovementKind,
            models::inventory::StockMovement,
            models::inventory::CreateCategoryPayload,
            models::inventory::CreateProductPayload,
            models::inventory::RecordMovementPayload,

            // --- Payloads ---
            handlers::orders::CreateOrderPayload,
            handlers::orders::UpdateOrderPayload,
            handlers::orders::AssignWorkersPayload,
            handlers::orders::PickedUpPayload,
            handlers::orders::RechargeDatePayload,
            handlers::orders::SendToReviewPayload,
            handlers::orders::UpdateCellPayload,
            handlers::photos::PhotoUpload,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação"),
        (name = "Users", description = "Usuários e Papéis"),
        (name = "Orders", description = "Ordens de Trabalho e Planilha de Extintores"),
        (name = "Photos", description = "Fotos de Recojo e da Guia"),
        (name = "Clients", description = "Gestão de Clientes"),
        (name = "Catalog", description = "Tipos, Capacidades e Marcas"),
        (name = "Extinguishers", description = "Cadastro Avulso de Extintores"),
        (name = "Dashboard", description = "Indicadores do Painel"),
        (name = "Maintenance", description = "Histórico de Manutenções"),
        (name = "Inventory", description = "Estoque de Peças")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_the_order_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/orders/{id}/picked-up"));
        assert!(doc.paths.paths.contains_key("/api/orders/{id}/guide-photos/{photo_id}"));
        assert!(doc.paths.paths.contains_key("/api/users/{id}/password"));
        assert!(doc.paths.paths.contains_key("/api/extinguishers/{id}"));
        assert!(doc.paths.paths.contains_key("/api/dashboard"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("api_jwt"));
    }
}
