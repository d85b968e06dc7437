use apisim::store::{Entity, VendorStore, object};
use apisim::workday::awards::{self, AwardFilter, LineItemFilter};
use apisim::workday::reports::{self, ReportKind};
use apisim::workday::scim::{self, ListUsers};
use apisim::workday::{
    self, Lookup, Relation, Resource, WorkdayStore, attachments, events, fields, projects,
    resources, supplier_companies,
};
use serde_json::{Value, json};

fn created(store: &mut WorkdayStore, resource: Resource, body: Value) -> Value {
    resources::create(store, resource, body).expect("create")
}

fn ids(listing: &Value) -> Vec<Value> {
    listing
        .as_array()
        .expect("array")
        .iter()
        .map(|entity| entity["id"].clone())
        .collect()
}

fn no_filter() -> Entity {
    Entity::new()
}

#[test]
fn generic_crud_uses_monotonic_ids_and_statuses() {
    let mut store = WorkdayStore::init();
    let (body, status) = workday::respond(
        resources::create(
            &mut store,
            Resource::SupplierCompanies,
            json!({ "id": 99, "name": "Acme", "external_id": "ACME" }),
        ),
        201,
    );
    assert_eq!(status, 201);
    assert_eq!(body["id"], 1);

    let by_external = resources::get(&store, Resource::SupplierCompanies, Lookup::ExternalId("ACME"))
        .expect("by external id");
    assert_eq!(by_external["name"], "Acme");

    resources::patch(
        &mut store,
        Resource::SupplierCompanies,
        Lookup::Id("1"),
        json!({ "id": 5, "name": "Acme Corp" }),
    )
    .expect("patch");
    let fetched = resources::get(&store, Resource::SupplierCompanies, Lookup::Id("1")).expect("get");
    assert_eq!(fetched["name"], "Acme Corp");
    assert_eq!(fetched["id"], 1);

    let deleted = workday::respond(
        resources::delete(&mut store, Resource::SupplierCompanies, Lookup::ExternalId("ACME")),
        200,
    );
    assert_eq!(deleted, (json!({}), 204));
    let (missing, status) =
        workday::respond(resources::get(&store, Resource::SupplierCompanies, Lookup::Id("1")), 200);
    assert_eq!(status, 404);
    assert!(missing["error"].as_str().expect("error").contains("not found"));

    let again = created(&mut store, Resource::SupplierCompanies, json!({ "name": "Next" }));
    assert_eq!(again["id"], 2);
    assert_eq!(
        workday::respond(resources::create(&mut store, Resource::SupplierCompanies, json!({})), 201),
        (json!({ "error": "Body is required" }), 400)
    );
}

#[test]
fn lists_filter_by_equality_and_page_at_fifty() {
    let mut store = WorkdayStore::init();
    for index in 0..60 {
        let state = if index % 2 == 0 { "active" } else { "draft" };
        created(&mut store, Resource::Contracts, json!({ "state": state }));
    }

    let everything = resources::list(&store, Resource::Contracts, &no_filter(), None).expect("list");
    assert_eq!(everything.as_array().expect("list").len(), 50);

    let active = object(json!({ "state": "active" }));
    let page = resources::list(&store, Resource::Contracts, &active, Some(3)).expect("list");
    assert_eq!(ids(&page), vec![json!(1), json!(3), json!(5)]);

    assert_eq!(
        resources::describe(&store, Resource::Contracts).expect("describe"),
        json!(["id", "state"])
    );
    assert_eq!(resources::describe(&store, Resource::Bids).expect("describe"), json!([]));
}

#[test]
fn patch_bodies_must_repeat_the_url_id() {
    let mut store = WorkdayStore::init();
    created(&mut store, Resource::Projects, json!({ "name": "Migration", "external_id": "P-1" }));

    let (error, status) = workday::respond(
        resources::patch(&mut store, Resource::Projects, Lookup::Id("1"), json!({ "name": "x" })),
        200,
    );
    assert_eq!(status, 400);
    assert_eq!(error["error"], "Id in body must match url");

    resources::patch(
        &mut store,
        Resource::Projects,
        Lookup::Id("1"),
        json!({ "id": 1, "name": "Cloud migration" }),
    )
    .expect("matching id");

    assert!(
        resources::patch(
            &mut store,
            Resource::Projects,
            Lookup::ExternalId("P-1"),
            json!({ "name": "y" }),
        )
        .is_err()
    );
    let patched = resources::patch(
        &mut store,
        Resource::Projects,
        Lookup::ExternalId("P-1"),
        json!({ "external_id": "P-1", "status": "active" }),
    )
    .expect("matching external id");
    assert_eq!(patched["name"], "Cloud migration");
    assert_eq!(patched["status"], "active");
}

#[test]
fn attachments_reject_duplicate_external_ids() {
    let mut store = WorkdayStore::init();
    for name in ["a.pdf", "b.pdf", "c.pdf"] {
        created(
            &mut store,
            Resource::Attachments,
            json!({ "name": name, "external_id": name }),
        );
    }
    let (error, status) = workday::respond(
        resources::create(&mut store, Resource::Attachments, json!({ "external_id": "b.pdf" })),
        201,
    );
    assert_eq!(status, 400);
    assert_eq!(error["error"], "Attachment with this external_id already exists.");

    let picked = attachments::list_by_ids(&store, "3, 1,9").expect("by ids");
    assert_eq!(ids(&picked), vec![json!(1), json!(3)]);

    let listing = attachments::list(&store, Some("2")).expect("list");
    assert_eq!(listing["meta"]["count"], 1);
    assert_eq!(listing["links"]["self"], "services/attachments/v1/attachments");
    assert_eq!(attachments::list(&store, None).expect("list")["meta"]["count"], 3);
}

#[test]
fn patch_cannot_take_another_entitys_external_id() {
    let mut store = WorkdayStore::init();
    created(&mut store, Resource::Attachments, json!({ "external_id": "X" }));
    created(&mut store, Resource::Attachments, json!({ "external_id": "Y" }));

    let (error, status) = workday::respond(
        resources::patch(
            &mut store,
            Resource::Attachments,
            Lookup::Id("2"),
            json!({ "external_id": "X" }),
        ),
        200,
    );
    assert_eq!(status, 400);
    assert_eq!(error["error"], "Attachment with this external_id already exists.");
    let second = resources::get(&store, Resource::Attachments, Lookup::Id("2")).expect("get");
    assert_eq!(second["external_id"], "Y");

    let kept = resources::patch(
        &mut store,
        Resource::Attachments,
        Lookup::Id("2"),
        json!({ "external_id": "Y", "name": "y.pdf" }),
    )
    .expect("own external id");
    assert_eq!(kept["name"], "y.pdf");
}

#[test]
fn awards_filter_by_state_dates_and_line_items() {
    let mut store = WorkdayStore::init();
    created(&mut store, Resource::Awards, json!({ "state": "confirmed", "updated_at": "2024-01-10" }));
    created(&mut store, Resource::Awards, json!({ "state": "draft", "updated_at": "2024-02-10" }));
    created(&mut store, Resource::Awards, json!({ "state": "confirmed", "updated_at": "2024-03-10" }));

    let confirmed = awards::list(
        &store,
        &AwardFilter {
            states: &["confirmed"],
            updated_from: Some("2024-02-01"),
            ..AwardFilter::default()
        },
    )
    .expect("awards");
    assert_eq!(ids(&confirmed), vec![json!(3)]);

    created(&mut store, Resource::AwardLineItems, json!({ "award_id": 1, "is_quoted": true, "line_item_type": "goods" }));
    created(&mut store, Resource::AwardLineItems, json!({ "award_id": 1, "is_quoted": false, "line_item_type": "goods" }));
    created(&mut store, Resource::AwardLineItems, json!({ "award_id": 2, "is_quoted": true, "line_item_type": "goods" }));
    let quoted = awards::line_items(
        &store,
        "1",
        &LineItemFilter {
            quoted: Some(true),
            types: &["goods"],
        },
    )
    .expect("line items");
    assert_eq!(ids(&quoted), vec![json!(1)]);
}

#[test]
fn events_scope_worksheets_and_line_items() {
    let mut store = WorkdayStore::init();
    let event = created(&mut store, Resource::Events, json!({ "title": "Laptops", "type": "RFP" }));
    assert_eq!(event["duplication_state"], "scheduled");
    created(&mut store, Resource::Worksheets, json!({ "event_id": 1, "title": "Hardware" }));

    let items = events::create_line_items(
        &mut store,
        "1",
        "1",
        vec![json!({ "name": "13 inch" }), json!({ "name": "15 inch" })],
    )
    .expect("create many");
    assert_eq!(ids(&items), vec![json!(1), json!(2)]);
    assert!(events::create_line_items(&mut store, "1", "1", vec![json!({ "name": "x" }), json!({})]).is_err());
    assert_eq!(events::line_items(&store, "1", "1").expect("items").as_array().expect("items").len(), 2);

    assert!(events::line_item(&store, "2", "1", "1").is_err());
    assert!(events::create_line_item(&mut store, "1", "7", json!({ "name": "x" })).is_err());

    let patched = events::patch_line_item(&mut store, "1", "1", "2", json!({ "id": 2, "quantity": 4 }))
        .expect("patch");
    assert_eq!(patched["quantity"], 4);
    assert_eq!(patched["worksheet_id"], 1);

    events::delete_line_item(&mut store, "1", "1", "1").expect("delete");
    assert_eq!(ids(&events::line_items(&store, "1", "1").expect("items")), vec![json!(2)]);
    assert_eq!(events::worksheets(&store, "1").expect("worksheets")[0]["title"], "Hardware");
}

#[test]
fn only_rfp_events_take_suppliers_and_bids() {
    let mut store = WorkdayStore::init();
    created(&mut store, Resource::Events, json!({ "type": "RFP", "external_id": "EV-1" }));
    created(&mut store, Resource::Events, json!({ "type": "AUCTION" }));
    created(&mut store, Resource::Bids, json!({ "event_id": 1, "status": "submitted" }));
    created(&mut store, Resource::Bids, json!({ "event_id": 2, "status": "submitted" }));
    created(&mut store, Resource::BidLineItems, json!({ "bid_id": 1, "price": 10 }));

    let event = events::add_suppliers(
        &mut store,
        Lookup::ExternalId("EV-1"),
        Relation::SupplierCompanies,
        &[json!(4), json!(5)],
    )
    .expect("add");
    assert_eq!(event["supplier_companies"], json!([4, 5]));
    let event = events::remove_suppliers(&mut store, Lookup::Id("1"), Relation::SupplierCompanies, &[json!(4)])
        .expect("remove");
    assert_eq!(event["supplier_companies"], json!([5]));

    let (error, status) = workday::respond(
        events::add_suppliers(&mut store, Lookup::Id("2"), Relation::SupplierContacts, &[json!(1)]),
        200,
    );
    assert_eq!(status, 400);
    assert_eq!(error["error"], "Event 2 is not an RFP");

    let bids = events::bids(&store, "1", &object(json!({ "status": "submitted" })), None).expect("bids");
    assert_eq!(ids(&bids), vec![json!(1)]);
    assert_eq!(events::bids(&store, "2", &no_filter(), None).expect("bids"), json!([]));
    assert!(events::bids(&store, "9", &no_filter(), None).is_err());
    assert_eq!(events::bid_line_items(&store, "1").expect("items")[0]["price"], 10);
}

#[test]
fn field_options_belong_to_existing_fields() {
    let mut store = WorkdayStore::init();
    assert!(fields::set_options(&mut store, "1", vec![json!("a")]).is_err());

    created(&mut store, Resource::Fields, json!({ "name": "Region" }));
    fields::set_options(&mut store, "1", vec![json!("EMEA"), json!("APAC")]).expect("set");
    assert!(fields::set_options(&mut store, "1", vec![]).is_err());

    fields::patch_options(&mut store, "1", vec![json!("AMER")]).expect("patch");
    assert_eq!(fields::options(&store, "1").expect("options")["options"], json!(["AMER"]));

    fields::delete_options(&mut store, "1").expect("delete");
    assert!(fields::options(&store, "1").is_err());
    assert!(fields::delete_options(&mut store, "1").is_err());
}

#[test]
fn projects_link_suppliers_by_external_id() {
    let mut store = WorkdayStore::init();
    created(&mut store, Resource::Projects, json!({ "name": "Office", "external_id": "OFF" }));

    projects::add_suppliers(&mut store, Lookup::ExternalId("OFF"), Relation::SupplierContacts, &[json!("C-1"), json!("C-2")])
        .expect("add");
    let project = projects::remove_suppliers(&mut store, Lookup::Id("1"), Relation::SupplierContacts, &[json!("C-1")])
        .expect("remove");
    assert_eq!(project["supplier_contacts"], json!(["C-2"]));
    assert!(projects::add_suppliers(&mut store, Lookup::Id("4"), Relation::SupplierCompanies, &[]).is_err());
}

#[test]
fn supplier_company_contacts_by_id_and_external_id() {
    let mut store = WorkdayStore::init();
    created(&mut store, Resource::SupplierCompanies, json!({ "name": "Acme", "external_id": "ACME" }));
    created(&mut store, Resource::SupplierContacts, json!({ "company_id": 1, "role": "sales" }));
    created(&mut store, Resource::SupplierContacts, json!({ "company_id": 1, "role": "legal" }));
    created(&mut store, Resource::SupplierContacts, json!({ "company_id": 2, "role": "sales" }));

    let all = supplier_companies::contacts(&store, Lookup::Id("1"), &no_filter()).expect("contacts");
    assert_eq!(ids(&all), vec![json!(1), json!(2)]);
    let sales = supplier_companies::contacts(&store, Lookup::ExternalId("ACME"), &object(json!({ "role": "sales" })))
        .expect("contacts");
    assert_eq!(ids(&sales), vec![json!(1)]);
    assert!(supplier_companies::contacts(&store, Lookup::ExternalId("NOPE"), &no_filter()).is_err());
}

#[test]
fn reports_come_back_per_kind() {
    let mut store = WorkdayStore::init();
    let stored = &mut store.db_mut().reports;
    stored.insert("savings_reports_entries".to_string(), json!([{ "saved": 100 }]));
    stored.insert("savings_reports_schema".to_string(), json!({ "fields": ["saved"] }));
    stored.insert("project_reports_3_entries".to_string(), json!([{ "id": "p3" }]));
    stored.insert("suppliers".to_string(), json!([{ "id": 7, "name": "Acme" }]));

    assert_eq!(reports::entries(&store, ReportKind::Savings).expect("entries")[0]["saved"], 100);
    assert_eq!(reports::schema(&store, ReportKind::Savings).expect("schema")["fields"], json!(["saved"]));
    assert_eq!(reports::entries(&store, ReportKind::SupplierReview).expect("entries"), json!([]));
    assert_eq!(reports::project_report_entries(&store, "3").expect("entries")[0]["id"], "p3");
    assert_eq!(reports::event_reports(&store).expect("reports"), json!([]));
    assert_eq!(reports::supplier(&store, "7").expect("supplier")["name"], "Acme");
    assert!(reports::supplier(&store, "8").is_err());
}

#[test]
fn scim_users_list_sort_and_page() {
    let mut store = WorkdayStore::init();
    for (user, title) in [("carol", "cfo"), ("alice", "ceo"), ("bob", "cto")] {
        scim::create_user(&mut store, json!({ "userName": user, "title": title, "active": true }))
            .expect("create");
    }
    assert!(scim::create_user(&mut store, json!({ "userName": "Alice" })).is_err());
    assert!(scim::create_user(&mut store, json!({ "title": "nobody" })).is_err());

    let sorted = scim::list_users(
        &store,
        &ListUsers {
            sort_by: Some("userName"),
            sort_order: Some("descending"),
            start_index: Some(2),
            count: Some(1),
            attributes: Some("userName"),
            ..ListUsers::default()
        },
    )
    .expect("list");
    assert_eq!(sorted["totalResults"], 3);
    assert_eq!(sorted["itemsPerPage"], 1);
    assert_eq!(sorted["Resources"][0], json!({ "id": "3", "userName": "bob" }));

    let filtered = scim::list_users(
        &store,
        &ListUsers {
            filter: Some(r#"title co "c""#),
            ..ListUsers::default()
        },
    )
    .expect("list");
    assert_eq!(filtered["totalResults"], 3);
    let exact = scim::list_users(
        &store,
        &ListUsers {
            filter: Some(r#"userName eq "ALICE""#),
            ..ListUsers::default()
        },
    )
    .expect("list");
    assert_eq!(exact["Resources"][0]["id"], "2");
}

#[test]
fn scim_users_patch_replace_and_delete() {
    let mut store = WorkdayStore::init();
    scim::create_user(&mut store, json!({ "userName": "ada", "title": "analyst" })).expect("create");

    let patched = scim::patch_user(
        &mut store,
        "1",
        json!({ "Operations": [
            { "op": "replace", "path": "title", "value": "countess" },
            { "op": "add", "path": "name.givenName", "value": "Ada" },
            { "op": "replace", "path": "id", "value": "42" },
        ] }),
    )
    .expect("patch");
    assert_eq!(patched["title"], "countess");
    assert_eq!(patched["name"]["givenName"], "Ada");
    assert_eq!(patched["id"], "1");
    assert!(scim::patch_user(&mut store, "1", json!({ "Operations": [{ "op": "move" }] })).is_err());
    assert_eq!(scim::get_user(&store, "1", None).expect("get")["title"], "countess");

    let replaced = scim::replace_user(&mut store, "1", json!({ "userName": "ada.l" })).expect("put");
    assert_eq!(replaced["id"], "1");
    assert!(replaced.get("title").is_none());
    assert_eq!(replaced["meta"]["resourceType"], "User");

    assert_eq!(workday::respond(scim::delete_user(&mut store, "1"), 200).1, 204);
    assert_eq!(workday::respond(scim::get_user(&store, "1", None), 200).1, 404);
}

#[test]
fn scim_discovery_documents() {
    let mut store = WorkdayStore::init();
    let scim_db = &mut store.db_mut().scim;
    scim_db.schemas.push(object(json!({ "id": "urn:ietf:params:scim:schemas:core:2.0:User", "name": "User" })));
    scim_db.resource_types.push(object(json!({ "id": "User", "name": "User", "endpoint": "/Users" })));
    scim_db.service_provider_config = object(json!({ "patch": { "supported": true } }));

    assert_eq!(
        scim::schema(&store, "urn:ietf:params:scim:schemas:core:2.0:User").expect("schema")["name"],
        "User"
    );
    assert!(scim::schema(&store, "urn:missing").is_err());
    assert_eq!(scim::schemas(&store).expect("schemas").as_array().expect("schemas").len(), 1);
    assert_eq!(scim::resource_type(&store, "User").expect("type")["endpoint"], "/Users");
    assert_eq!(scim::resource_types(&store).expect("types")[0]["id"], "User");
    assert_eq!(
        scim::service_provider_config(&store).expect("config")["patch"]["supported"],
        true
    );
}

#[test]
fn state_survives_a_save_and_missing_files_are_ignored() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut store = WorkdayStore::init();
    created(&mut store, Resource::SpendCategories, json!({ "name": "Travel", "external_id": "TRV" }));
    created(&mut store, Resource::SpendCategories, json!({ "name": "Meals" }));
    resources::delete(&mut store, Resource::SpendCategories, Lookup::Id("2")).expect("delete");

    store.load(&dir.path().join("absent.json")).expect("load");
    assert_eq!(store.entities(Resource::SpendCategories).count(), 1);

    let path = dir.path().join("workday.json");
    store.save(&path).expect("save");
    let mut reopened = WorkdayStore::open(&path).expect("open");
    assert_eq!(reopened.db(), store.db());

    let next = created(&mut reopened, Resource::SpendCategories, json!({ "name": "Hotels" }));
    assert_eq!(next["id"], 3);

    reopened.reset();
    assert_eq!(reopened.entities(Resource::SpendCategories).count(), 0);
}
