use apisim::chat::members::ListMembers;
use apisim::chat::messages::{CreateMessage, ListMessages};
use apisim::chat::spaces::{ListSpaces, SearchSpaces};
use apisim::chat::{
    self, ChatStore, attachments, media, members, messages, reactions, space_events, spaces, users,
};
use apisim::error::SimError;
use apisim::store::{VendorStore, object};
use serde_json::{Value, json};

fn names(listing: &Value, key: &str) -> Vec<String> {
    listing[key]
        .as_array()
        .expect("listing array")
        .iter()
        .map(|item| item["name"].as_str().expect("name").to_string())
        .collect()
}

fn new_space(store: &mut ChatStore, display_name: &str) -> String {
    let space = spaces::create(
        store,
        json!({ "spaceType": "SPACE", "displayName": display_name, "customer": "customers/my_customer" }),
        None,
    )
    .expect("space created");
    space["name"].as_str().expect("space name").to_string()
}

#[test]
fn create_adds_exactly_one_space_and_caller_membership() {
    let mut store = ChatStore::init();
    let spaces_before = store.db().spaces.len();
    let members_before = store.db().memberships.len();

    let name = new_space(&mut store, "X");
    assert_eq!(name, "spaces/SPACE_1");
    assert_eq!(store.db().spaces.len(), spaces_before + 1);
    assert_eq!(store.db().memberships.len(), members_before + 1);

    let membership = members::get(&store, &format!("{name}/members/users/user123"), false)
        .expect("caller membership");
    assert_eq!(membership["role"], "ROLE_MANAGER");
    assert_eq!(membership["member"]["displayName"], "abc");
}

#[test]
fn delete_cascades_children_by_prefix() {
    let mut store = ChatStore::init();
    let name = new_space(&mut store, "X");
    members::create(
        &mut store,
        &name,
        json!({ "member": { "name": "users/extra@example.com", "type": "HUMAN" } }),
        false,
    )
    .expect("member");
    let message = messages::create(
        &mut store,
        &name,
        json!({ "text": "bye" }),
        &CreateMessage::default(),
    )
    .expect("message");
    let message_name = message["name"].as_str().expect("message name").to_string();
    reactions::create(&mut store, &message_name, json!({ "emoji": { "unicode": "🙂" } }))
        .expect("reaction");

    assert_eq!(spaces::delete(&mut store, &name, false), Ok(json!({})));

    let prefix = format!("{name}/");
    let db = store.db();
    assert!(!db.spaces.contains(&name));
    for collection in [&db.memberships, &db.messages, &db.reactions] {
        assert!(
            collection
                .iter()
                .all(|entry| !entry["name"].as_str().unwrap_or("").starts_with(&prefix))
        );
    }
}

#[test]
fn create_validates_type_and_display_name() {
    let mut store = ChatStore::init();
    assert_eq!(
        spaces::create(&mut store, json!({ "displayName": "x" }), None),
        Err(SimError::invalid("spaceType is required."))
    );
    assert!(matches!(
        spaces::create(&mut store, json!({ "spaceType": "SPACE" }), None),
        Err(SimError::Validation(_))
    ));

    new_space(&mut store, "Team");
    let duplicate = spaces::create(
        &mut store,
        json!({ "spaceType": "SPACE", "displayName": " team " }),
        None,
    );
    assert_eq!(
        chat::respond(duplicate),
        json!({ "error": "A space with displayName 'team' already exists." })
    );
}

#[test]
fn request_id_replays_the_first_create() {
    let mut store = ChatStore::init();
    let body = json!({ "spaceType": "GROUP_CHAT" });
    let first = spaces::create(&mut store, body.clone(), Some("req-1")).expect("created");
    let again = spaces::create(&mut store, body, Some("req-1")).expect("replayed");
    assert_eq!(first, again);
}

#[test]
fn bot_dm_and_import_mode_skip_caller_membership() {
    let mut store = ChatStore::init();
    let before = store.db().memberships.len();
    spaces::create(
        &mut store,
        json!({ "spaceType": "DIRECT_MESSAGE", "singleUserBotDm": true }),
        None,
    )
    .expect("dm");
    spaces::create(
        &mut store,
        json!({ "spaceType": "SPACE", "displayName": "Imported", "importMode": true }),
        None,
    )
    .expect("import");
    assert_eq!(store.db().memberships.len(), before);
}

#[test]
fn setup_invites_members_but_not_the_caller() {
    let mut store = ChatStore::init();
    let space = spaces::setup(
        &mut store,
        json!({
            "space": { "spaceType": "SPACE", "displayName": "Setup Space" },
            "memberships": [
                { "member": { "name": "users/other@example.com", "type": "HUMAN" } },
                { "member": { "name": "USERS/USER123", "type": "HUMAN" } },
            ],
        }),
    )
    .expect("setup");
    let name = space["name"].as_str().expect("name");

    let listed = members::list(&store, name, &ListMembers::default()).expect("members");
    assert_eq!(
        names(&listed, "memberships"),
        vec![
            format!("{name}/members/users/user123"),
            format!("{name}/members/users/other@example.com"),
        ]
    );
    assert_eq!(listed["memberships"][1]["state"], "INVITED");
}

#[test]
fn list_only_returns_member_spaces_and_filters_types() {
    let mut store = ChatStore::init();
    new_space(&mut store, "Mine");
    spaces::create(&mut store, json!({ "spaceType": "GROUP_CHAT" }), None).expect("group");

    let all = spaces::list(&store, &ListSpaces::default()).expect("list");
    assert_eq!(all["spaces"].as_array().map(Vec::len), Some(3));

    let groups = spaces::list(
        &store,
        &ListSpaces {
            filter: Some(r#"spaceType = "GROUP_CHAT" OR space_type = "DIRECT_MESSAGE""#),
            ..ListSpaces::default()
        },
    )
    .expect("filtered");
    assert_eq!(names(&groups, "spaces"), vec!["spaces/SPACE_2"]);

    let and = spaces::list(
        &store,
        &ListSpaces {
            filter: Some(r#"spaceType = "SPACE" AND spaceType = "GROUP_CHAT""#),
            ..ListSpaces::default()
        },
    );
    assert_eq!(
        and,
        Err(SimError::invalid("'AND' operator is not supported. Use 'OR' instead."))
    );

    let bad = spaces::list(
        &store,
        &ListSpaces {
            filter: Some(r#"spaceType = "ROOM""#),
            ..ListSpaces::default()
        },
    );
    assert_eq!(bad, Err(SimError::invalid("Invalid space type: 'ROOM'")));

    users::change_user(&mut store, "users/stranger");
    let none = spaces::list(&store, &ListSpaces::default()).expect("list");
    assert_eq!(none["spaces"], json!([]));
}

#[test]
fn search_requires_admin_and_mandatory_clauses() {
    let mut store = ChatStore::init();
    new_space(&mut store, "Team Chat Room");
    new_space(&mut store, "Fun Event");

    let query = r#"customer = "customers/my_customer" AND space_type = "SPACE" AND display_name:"team""#;
    let denied = spaces::search(
        &store,
        &SearchSpaces {
            query,
            ..SearchSpaces::default()
        },
    );
    assert!(matches!(denied, Err(SimError::Unsupported(_))));

    let missing_customer = spaces::search(
        &store,
        &SearchSpaces {
            use_admin_access: true,
            query: r#"space_type = "SPACE""#,
            ..SearchSpaces::default()
        },
    );
    assert!(matches!(missing_customer, Err(SimError::Validation(_))));

    let found = spaces::search(
        &store,
        &SearchSpaces {
            use_admin_access: true,
            query,
            ..SearchSpaces::default()
        },
    )
    .expect("search");
    assert_eq!(names(&found, "spaces"), vec!["spaces/SPACE_1"]);
}

#[test]
fn search_orders_and_pages() {
    let mut store = ChatStore::init();
    for (name, created, count) in [
        ("spaces/AAA", "2022-05-01T10:00:00Z", 10),
        ("spaces/BBB", "2021-12-15T09:30:00Z", 25),
        ("spaces/CCC", "2023-01-10T08:00:00Z", 2),
    ] {
        store.db_mut().spaces.insert(object(json!({
            "name": name,
            "spaceType": "SPACE",
            "customer": "customers/my_customer",
            "createTime": created,
            "membershipCount": { "joinedDirectHumanUserCount": count },
        })));
    }
    let query = r#"customer = "customers/my_customer" AND space_type = "SPACE""#;

    let by_members = spaces::search(
        &store,
        &SearchSpaces {
            use_admin_access: true,
            query,
            order_by: Some("membership_count.joined_direct_human_user_count DESC"),
            ..SearchSpaces::default()
        },
    )
    .expect("search");
    assert_eq!(
        names(&by_members, "spaces"),
        vec!["spaces/BBB", "spaces/AAA", "spaces/CCC"]
    );

    let first_page = spaces::search(
        &store,
        &SearchSpaces {
            use_admin_access: true,
            query,
            page_size: Some(2),
            ..SearchSpaces::default()
        },
    )
    .expect("search");
    assert_eq!(names(&first_page, "spaces"), vec!["spaces/BBB", "spaces/AAA"]);
    assert_eq!(first_page["nextPageToken"], "2");

    let recent = spaces::search(
        &store,
        &SearchSpaces {
            use_admin_access: true,
            query: r#"customer = "customers/my_customer" AND space_type = "SPACE" AND create_time >= "2022-05-01T10:00:00Z""#,
            ..SearchSpaces::default()
        },
    )
    .expect("search");
    assert_eq!(names(&recent, "spaces"), vec!["spaces/AAA", "spaces/CCC"]);
}

#[test]
fn get_hides_spaces_from_non_members() {
    let mut store = ChatStore::init();
    let name = new_space(&mut store, "Private");
    assert!(spaces::get(&store, &name, false).is_ok());

    users::change_user(&mut store, "users/OTHER");
    assert_eq!(chat::respond(spaces::get(&store, &name, false)), json!({}));
    assert!(spaces::get(&store, &name, true).is_ok());
}

#[test]
fn patch_applies_masked_fields() {
    let mut store = ChatStore::init();
    let name = new_space(&mut store, "Patch Space");
    let long = "d".repeat(200);
    let updated = spaces::patch(
        &mut store,
        &name,
        "space_details,display_name,space_history_state,access_settings.audience,permission_settings",
        json!({
            "spaceDetails": { "description": long },
            "displayName": "Patched",
            "spaceHistoryState": "HISTORY_OFF",
            "accessSettings": { "audience": "SPECIFIC_USERS" },
            "permissionSettings": { "manageMembersAndGroups": true },
        }),
        false,
    )
    .expect("patched");

    assert_eq!(updated["displayName"], "Patched");
    assert_eq!(updated["spaceHistoryState"], "HISTORY_OFF");
    assert_eq!(updated["accessSettings"]["audience"], "SPECIFIC_USERS");
    assert_eq!(
        updated["spaceDetails"]["description"].as_str().map(str::len),
        Some(150)
    );
}

#[test]
fn group_chat_becomes_space_only_with_display_name() {
    let mut store = ChatStore::init();
    let group = spaces::create(&mut store, json!({ "spaceType": "GROUP_CHAT" }), None)
        .expect("group");
    let name = group["name"].as_str().expect("name");

    let rejected = spaces::patch(&mut store, name, "space_type", json!({ "spaceType": "SPACE" }), false);
    assert!(matches!(rejected, Err(SimError::Validation(_))));

    let partial = spaces::patch(
        &mut store,
        name,
        "space_details,space_type",
        json!({ "spaceDetails": { "description": "changed" }, "spaceType": "SPACE" }),
        false,
    );
    assert!(matches!(partial, Err(SimError::Validation(_))));
    let unchanged = spaces::get(&store, name, false).expect("space");
    assert!(unchanged.get("spaceDetails").is_none());
    assert_eq!(unchanged["spaceType"], "GROUP_CHAT");

    let converted = spaces::patch(
        &mut store,
        name,
        "space_type",
        json!({ "spaceType": "SPACE", "displayName": "Promoted" }),
        false,
    )
    .expect("converted");
    assert_eq!(converted["spaceType"], "SPACE");
}

#[test]
fn message_lifecycle() {
    let mut store = ChatStore::init();
    let space = new_space(&mut store, "Messages");

    let created = messages::create(
        &mut store,
        &space,
        json!({ "text": "Hello, world!" }),
        &CreateMessage {
            message_id: Some("client-001"),
            ..CreateMessage::default()
        },
    )
    .expect("created");
    let name = format!("{space}/messages/client-001");
    assert_eq!(created["name"], json!(name));
    assert_eq!(created["clientAssignedMessageId"], "client-001");

    let updated = messages::update(&mut store, &name, "text", false, json!({ "text": "edited" }))
        .expect("updated");
    assert_eq!(updated["text"], "edited");
    assert_eq!(messages::get(&store, &name).expect("get")["text"], "edited");

    assert_eq!(messages::delete(&mut store, &name, false), Ok(json!({})));
    assert_eq!(chat::respond(messages::get(&store, &name)), json!({}));
}

#[test]
fn message_create_rejects_bad_ids_and_outsiders() {
    let mut store = ChatStore::init();
    let space = new_space(&mut store, "Strict");

    let bad_id = messages::create(
        &mut store,
        &space,
        json!({ "text": "x" }),
        &CreateMessage {
            message_id: Some("001"),
            ..CreateMessage::default()
        },
    );
    assert_eq!(bad_id, Err(SimError::invalid("messageId must start with 'client-'.")));

    users::change_user(&mut store, "users/outsider");
    let outsider = messages::create(&mut store, &space, json!({ "text": "x" }), &CreateMessage::default());
    assert_eq!(chat::respond(outsider), json!({}));
    let listed = messages::list(&store, &space, &ListMessages::default()).expect("list");
    assert_eq!(listed, json!({ "messages": [] }));
}

#[test]
fn message_list_filters_threads_and_times() {
    let mut store = ChatStore::init();
    let space = new_space(&mut store, "Threads");
    for (text, thread) in [("a", "t1"), ("b", "t2"), ("c", "t1")] {
        messages::create(
            &mut store,
            &space,
            json!({ "text": text, "thread": { "name": format!("{space}/threads/{thread}") } }),
            &CreateMessage::default(),
        )
        .expect("message");
    }

    let filter = format!("thread.name = {space}/threads/t1");
    let threaded = messages::list(
        &store,
        &space,
        &ListMessages {
            filter: Some(&filter),
            ..ListMessages::default()
        },
    )
    .expect("list");
    let texts = threaded["messages"]
        .as_array()
        .expect("messages")
        .iter()
        .map(|m| m["text"].as_str().expect("text"))
        .collect::<Vec<_>>();
    assert_eq!(texts, vec!["a", "c"]);

    let later = messages::list(
        &store,
        &space,
        &ListMessages {
            filter: Some(r#"create_time >= "2000-01-01T00:00:00Z""#),
            page_size: Some(2),
            ..ListMessages::default()
        },
    )
    .expect("list");
    assert_eq!(later["messages"].as_array().map(Vec::len), Some(2));
    assert_eq!(later["nextPageToken"], "2");

    let none = messages::list(
        &store,
        &space,
        &ListMessages {
            filter: Some(r#"create_time < "2000-01-01T00:00:00Z""#),
            ..ListMessages::default()
        },
    )
    .expect("list");
    assert_eq!(none["messages"], json!([]));
}

#[test]
fn thread_replies_block_delete_without_force() {
    let mut store = ChatStore::init();
    let space = new_space(&mut store, "Replies");
    let thread = json!({ "name": format!("{space}/threads/t1") });
    let root = messages::create(
        &mut store,
        &space,
        json!({ "text": "root", "thread": thread }),
        &CreateMessage::default(),
    )
    .expect("root");
    messages::create(
        &mut store,
        &space,
        json!({ "text": "reply", "thread": thread }),
        &CreateMessage::default(),
    )
    .expect("reply");
    let root = root["name"].as_str().expect("name");

    assert!(matches!(
        messages::delete(&mut store, root, false),
        Err(SimError::Validation(_))
    ));
    assert_eq!(messages::delete(&mut store, root, true), Ok(json!({})));
    let listed = messages::list(&store, &space, &ListMessages::default()).expect("list");
    assert_eq!(listed["messages"], json!([]));
}

#[test]
fn update_allow_missing_creates_client_messages() {
    let mut store = ChatStore::init();
    let space = new_space(&mut store, "Upsert");

    let missing = messages::update(&mut store, &format!("{space}/messages/9"), "text", true, json!({}));
    assert!(matches!(missing, Err(SimError::NotFound(_))));

    let name = format!("{space}/messages/client-up");
    let created = messages::update(&mut store, &name, "*", true, json!({ "text": "new", "cards_v2": [] }))
        .expect("upserted");
    assert_eq!(created["text"], "new");
    assert_eq!(created["cardsV2"], json!([]));
    assert!(matches!(
        messages::patch(&mut store, &name, "text", json!({})),
        Err(SimError::Unsupported(_))
    ));
}

#[test]
fn attachments_resolve_through_their_message() {
    let mut store = ChatStore::init();
    let space = new_space(&mut store, "Files");
    let message = messages::create(
        &mut store,
        &space,
        json!({
            "text": "file",
            "attachment": [{ "name": format!("{space}/messages/1/attachments/ATT1"), "contentName": "file.png" }],
        }),
        &CreateMessage::default(),
    )
    .expect("message");
    assert_eq!(message["name"], json!(format!("{space}/messages/1")));

    let found = attachments::get(&store, &format!("{space}/messages/1/attachments/ATT1"))
        .expect("attachment");
    assert_eq!(found["contentName"], "file.png");
    assert!(matches!(
        attachments::get(&store, &format!("{space}/messages/1")),
        Err(SimError::Validation(_))
    ));
}

#[test]
fn upload_guesses_content_type() {
    let mut store = ChatStore::init();
    let uploaded = media::upload(&mut store, "spaces/AAA", json!({ "contentName": "agenda.pdf" }))
        .expect("uploaded");
    assert_eq!(uploaded["name"], "spaces/AAA/attachments/1");
    assert_eq!(uploaded["contentType"], "application/pdf");
    assert_eq!(uploaded["source"], "UPLOADED_CONTENT");
    assert!(matches!(
        media::download(&store, "spaces/AAA/attachments/1"),
        Err(SimError::Unsupported(_))
    ));
}

#[test]
fn reaction_filters() {
    let mut store = ChatStore::init();
    let parent = "spaces/AAA/messages/1";
    reactions::create(
        &mut store,
        parent,
        json!({ "emoji": { "unicode": "🙂" }, "user": { "name": "users/a" } }),
    )
    .expect("reaction");
    reactions::create(
        &mut store,
        parent,
        json!({ "emoji": { "customEmoji": { "uid": "party" } }, "user": { "name": "users/b" } }),
    )
    .expect("reaction");

    let list = |filter: &str| {
        let listed = reactions::list(&store, parent, None, None, Some(filter)).expect("list");
        names(&listed, "reactions")
    };
    assert_eq!(list(r#"emoji.unicode = "🙂""#), vec![format!("{parent}/reactions/1")]);
    assert_eq!(
        list(r#"emoji.unicode = "🙂" OR emoji.custom_emoji.uid = "party" AND user.name = "users/b""#),
        vec![format!("{parent}/reactions/2")]
    );
    assert!(list(r#"user.email = "a@example.com""#).is_empty());
    assert!(list("garbage").is_empty());

    reactions::delete(&mut store, &format!("{parent}/reactions/1")).expect("deleted");
    let remaining = reactions::list(&store, parent, None, None, None).expect("list");
    assert_eq!(names(&remaining, "reactions"), vec![format!("{parent}/reactions/2")]);
}

#[test]
fn member_listing_filters_and_admin_rules() {
    let mut store = ChatStore::init();
    let space = new_space(&mut store, "Members");
    members::create(
        &mut store,
        &space,
        json!({ "member": { "name": "users/guest", "type": "HUMAN" } }),
        false,
    )
    .expect("guest");
    store.db_mut().memberships.insert(object(json!({
        "name": format!("{space}/members/app"),
        "role": "ROLE_MEMBER",
        "state": "JOINED",
        "member": { "name": "users/app", "type": "BOT" },
    })));

    let managers = members::list(
        &store,
        &space,
        &ListMembers {
            filter: Some(r#"role = "ROLE_MANAGER""#),
            ..ListMembers::default()
        },
    )
    .expect("list");
    assert_eq!(names(&managers, "memberships"), vec![format!("{space}/members/users/user123")]);

    let joined = members::list(
        &store,
        &space,
        &ListMembers {
            show_invited: Some(false),
            ..ListMembers::default()
        },
    )
    .expect("list");
    assert_eq!(joined["memberships"].as_array().map(Vec::len), Some(2));

    let admin_without_filter = members::list(
        &store,
        &space,
        &ListMembers {
            use_admin_access: true,
            ..ListMembers::default()
        },
    );
    assert!(matches!(admin_without_filter, Err(SimError::Validation(_))));

    let humans = members::list(
        &store,
        &space,
        &ListMembers {
            use_admin_access: true,
            filter: Some(r#"member.type != "BOT""#),
            ..ListMembers::default()
        },
    )
    .expect("list");
    assert_eq!(humans["memberships"].as_array().map(Vec::len), Some(2));

    let app = format!("{space}/members/app");
    assert!(matches!(members::get(&store, &app, true), Err(SimError::Unsupported(_))));
    assert!(matches!(members::delete(&mut store, &app, true), Err(SimError::Unsupported(_))));
    assert!(members::delete(&mut store, &app, false).is_ok());
}

#[test]
fn member_create_rules() {
    let mut store = ChatStore::init();
    let space = new_space(&mut store, "Invites");

    assert!(matches!(
        members::create(&mut store, &space, json!({ "member": { "name": "groups/x" } }), false),
        Err(SimError::Validation(_))
    ));
    assert!(matches!(
        members::create(
            &mut store,
            &space,
            json!({ "member": { "name": "users/bot", "type": "BOT" } }),
            true
        ),
        Err(SimError::Unsupported(_))
    ));

    let first = members::create(
        &mut store,
        &space,
        json!({ "member": { "name": "users/x" }, "role": "ROLE_MANAGER" }),
        false,
    )
    .expect("created");
    let again = members::create(&mut store, &space, json!({ "member": { "name": "users/x" } }), false)
        .expect("existing");
    assert_eq!(first, again);
    assert_eq!(again["role"], "ROLE_MANAGER");
}

#[test]
fn space_events_are_not_simulated() {
    let store = ChatStore::init();
    assert!(matches!(
        space_events::get(&store, "spaces/AAA/spaceEvents/1"),
        Err(SimError::Unsupported(_))
    ));
    assert!(matches!(
        space_events::list(&store, "spaces/AAA", None, None, "event_types:\"x\""),
        Err(SimError::Unsupported(_))
    ));
}

#[test]
fn user_read_states_and_notification_settings() {
    let mut store = ChatStore::init();
    let read_state = "users/me/spaces/AAA/spaceReadState";
    let setting = "users/me/spaces/AAA/spaceNotificationSetting";
    let db = store.db_mut();
    db.space_read_states.insert(object(json!({
        "name": read_state,
        "lastReadTime": "2023-05-01T12:00:00Z",
    })));
    db.thread_read_states.insert(object(json!({
        "name": "users/me/spaces/AAA/threads/T1/threadReadState",
        "lastReadTime": "2023-05-01T12:00:00Z",
    })));
    db.notification_settings.insert(object(json!({
        "name": setting,
        "notificationSetting": "ALL",
        "muteSetting": "UNMUTED",
    })));

    let updated = users::update_space_read_state(
        &mut store,
        read_state,
        "last_read_time",
        json!({ "last_read_time": "2023-06-01T15:00:00Z" }),
    )
    .expect("updated");
    assert_eq!(updated["lastReadTime"], "2023-06-01T15:00:00Z");
    assert_eq!(
        users::get_space_read_state(&store, read_state).expect("state"),
        updated
    );
    assert!(
        users::get_thread_read_state(&store, "users/me/spaces/AAA/threads/T1/threadReadState")
            .is_ok()
    );

    let patched = users::patch_space_notification_setting(
        &mut store,
        setting,
        "notification_setting, mute_setting",
        json!({ "notificationSetting": "MAIN_CONVERSATIONS", "mute_setting": "MUTED" }),
    )
    .expect("patched");
    assert_eq!(patched["notificationSetting"], "MAIN_CONVERSATIONS");
    assert_eq!(patched["muteSetting"], "MUTED");
    assert!(users::get_space_notification_setting(&store, "users/me/spaces/BBB/spaceNotificationSetting").is_err());
}

#[test]
fn harness_users_switch_the_caller() {
    let mut store = ChatStore::init();
    let user = users::create_user(&mut store, "Second", None);
    assert_eq!(user["name"], "users/user1");
    assert_eq!(user["type"], "HUMAN");

    users::change_user(&mut store, "users/user1");
    assert_eq!(store.current_user(), "users/user1");
    let name = new_space(&mut store, "Theirs");
    assert!(members::get(&store, &format!("{name}/members/users/user1"), false).is_ok());
}

#[test]
fn missing_state_file_is_an_error_and_saved_state_loads() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut store = ChatStore::init();
    assert!(store.load(&dir.path().join("missing.json")).is_err());

    new_space(&mut store, "Persisted");
    let path = dir.path().join("chat.json");
    store.save(&path).expect("saved");

    let loaded = ChatStore::open(&path).expect("loaded");
    assert!(loaded.db().spaces.contains("spaces/SPACE_1"));
    assert_eq!(loaded.snapshot().expect("snapshot"), store.snapshot().expect("snapshot"));
}
