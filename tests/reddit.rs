use apisim::error::SimError;
use apisim::reddit::unsimulated::{self, Area};
use apisim::reddit::{
    self, RedditStore, announcements, collections, emoji, links, live, messages, modnotes, multis,
    subreddits, users, widgets, wiki,
};
use apisim::store::{VendorStore, object};
use serde_json::{Value, json};

fn error_of(result: Result<Value, SimError>) -> String {
    match result {
        Err(err) => err.message().to_string(),
        Ok(other) => panic!("expected an error, got {other:?}"),
    }
}

#[test]
fn collections_track_their_links() {
    let mut store = RedditStore::init();
    let created = collections::create(&mut store, "Best of", "t5_abc").expect("create");
    assert_eq!(created["collection_id"], "col_1");

    collections::add_post(&mut store, "col_1", "t3_1").expect("add");
    collections::add_post(&mut store, "col_1", "t3_2").expect("add");
    collections::add_post(&mut store, "col_1", "t3_1").expect("add again");
    assert_eq!(
        collections::get(&store, "col_1").expect("get")["links"],
        json!(["t3_1", "t3_2"])
    );

    collections::reorder(&mut store, "col_1", &["t3_2", "t3_1"]).expect("reorder");
    collections::remove_post(&mut store, "t3_2", "col_1").expect("remove");
    assert_eq!(
        collections::get(&store, "col_1").expect("get")["links"],
        json!(["t3_1"])
    );
    assert_eq!(
        error_of(collections::remove_post(&mut store, "t3_9", "col_1")),
        "Link not found in collection"
    );
    assert_eq!(
        error_of(collections::add_post(&mut store, "col_9", "t3_1")),
        "Collection does not exist"
    );
}

#[test]
fn collection_updates_and_listing_by_subreddit() {
    let mut store = RedditStore::init();
    collections::create(&mut store, "One", "t5_a").expect("create");
    collections::create(&mut store, "Two", "t5_b").expect("create");

    collections::update_title(&mut store, "col_2", "Deux").expect("title");
    collections::update_description(&mut store, "col_2", "second").expect("description");
    let layout = collections::update_display_layout(&mut store, "col_2", "gallery").expect("layout");
    assert_eq!(layout["display_layout"], "GALLERY");
    assert!(collections::update_display_layout(&mut store, "col_2", "grid").is_err());

    let in_b = collections::subreddit_collections(&store, "t5_b").expect("list");
    assert_eq!(in_b.as_array().expect("collections").len(), 1);
    assert_eq!(in_b[0]["title"], "Deux");
    assert_eq!(in_b[0]["description"], "second");

    collections::delete(&mut store, "col_1").expect("delete");
    assert_eq!(error_of(collections::get(&store, "col_1")), "Collection not found");

    let again = collections::create(&mut store, "Three", "t5_a").expect("create");
    assert_eq!(again["collection_id"], "col_3");
}

#[test]
fn emoji_names_are_unique_per_subreddit() {
    let mut store = RedditStore::init();
    emoji::add(&mut store, "rust", "crab", Some(".crab{}")).expect("add");
    emoji::add(&mut store, "golang", "crab", None).expect("other subreddit");
    assert_eq!(
        error_of(emoji::add(&mut store, "rust", "crab", None)),
        "Emoji name already in use"
    );

    let all = emoji::all(&store, "rust").expect("all");
    assert_eq!(all["emojis"]["crab"]["css"], ".crab{}");

    emoji::delete(&mut store, "rust", "crab").expect("delete");
    assert_eq!(error_of(emoji::delete(&mut store, "rust", "crab")), "Emoji not found");
    assert_eq!(emoji::all(&store, "rust").expect("all")["emojis"], json!({}));
}

#[test]
fn deleted_things_cannot_be_edited() {
    let mut store = RedditStore::init();
    let link = links::submit(&mut store, "rust", "self", "Hello", Some("first post")).expect("submit");
    assert_eq!(link["link_id"], "t3_1");
    let comment = links::comment(&mut store, "t3_1", "nice").expect("comment");
    assert_eq!(comment["comment_id"], "t1_1");

    let edited = links::edit_user_text(&mut store, "t1_1", "very nice").expect("edit");
    assert_eq!(edited["status"], "updated_comment");
    assert_eq!(store.db().comments.get("t1_1").expect("comment")["body"], "very nice");

    let deleted = links::del(&mut store, "t3_1").expect("delete");
    assert_eq!(deleted["type"], "link");
    assert_eq!(
        error_of(links::edit_user_text(&mut store, "t3_1", "again")),
        "cannot_edit_deleted_post"
    );

    links::del(&mut store, "t1_1").expect("delete comment");
    assert_eq!(
        error_of(links::edit_user_text(&mut store, "t1_1", "again")),
        "cannot_edit_deleted_comment"
    );
    assert_eq!(error_of(links::del(&mut store, "t3_99")), "not_found");
}

#[test]
fn live_threads_close_to_updates() {
    let mut store = RedditStore::init();
    live::create(&mut store, "Launch").expect("create");
    live::update(&mut store, "live_1", "T-minus 10").expect("update");

    let thread = live::get(&store, "live_1").expect("get");
    assert_eq!(thread["info"]["updates"], json!(["T-minus 10"]));
    assert_eq!(thread["info"]["closed"], false);

    live::close(&mut store, "live_1").expect("close");
    assert_eq!(error_of(live::update(&mut store, "live_1", "late")), "Live thread is closed");
    assert!(live::close(&mut store, "live_9").is_err());
}

#[test]
fn messages_compose_and_delete() {
    let mut store = RedditStore::init();
    messages::compose(&mut store, "spez", "hi", "hello there").expect("compose");
    messages::compose(&mut store, "kn0thing", "yo", "sup").expect("compose");
    assert_eq!(error_of(messages::compose(&mut store, "", "x", "y")), "NO_USER");

    messages::del_msg(&mut store, "msg_1").expect("delete");
    let inbox = messages::inbox(&store).expect("inbox");
    assert_eq!(inbox.as_array().expect("inbox").len(), 1);
    assert_eq!(inbox[0]["id"], "msg_2");

    messages::compose(&mut store, "spez", "again", "text").expect("compose");
    assert!(store.db().messages.contains("msg_3"));
    assert_eq!(error_of(messages::del_msg(&mut store, "msg_1")), "not_found");
}

#[test]
fn multis_and_widgets() {
    let mut store = RedditStore::init();
    let copied = multis::copy(&mut store, "/user/a/m/tech", "/user/b/m/tech").expect("copy");
    assert_eq!(copied["new_multiname"], "multi_1");
    assert_eq!(multis::mine(&store).expect("mine")[0]["source"], "/user/a/m/tech");

    let widget = widgets::add(&mut store, json!({ "kind": "textarea", "text": "rules" })).expect("add");
    assert_eq!(widget["widget_id"], "widget_1");
    assert!(widgets::add(&mut store, json!("nope")).is_err());

    let listed = widgets::list(&store).expect("list");
    assert_eq!(listed["widgets"]["widget_1"]["kind"], "textarea");

    widgets::delete(&mut store, "widget_1").expect("delete");
    assert_eq!(error_of(widgets::delete(&mut store, "widget_1")), "widget_not_found");
}

#[test]
fn subreddits_users_and_wiki() {
    let mut store = RedditStore::init();
    subreddits::site_admin(&mut store, "rust", "The Rust language").expect("create");
    subreddits::site_admin(&mut store, "rust", "Rust").expect("edit");
    assert_eq!(store.db().subreddits.len(), 1);
    assert_eq!(subreddits::about(&store, "rust").expect("about")["info"]["title"], "Rust");
    assert_eq!(
        subreddits::about(&store, "nowhere").expect("about")["info"]["title"],
        "Untitled Subreddit"
    );

    store
        .db_mut()
        .users
        .insert(object(json!({ "name": "ferris", "link_karma": 10 })));
    assert_eq!(users::about(&store, "ferris").expect("about")["profile"]["link_karma"], 10);
    assert_eq!(
        reddit::respond(users::about(&store, "ghost")),
        json!({ "error": "not_found" })
    );

    wiki::edit(&mut store, "rust", "index", "Welcome").expect("edit");
    wiki::edit(&mut store, "rust", "faq", "Ask").expect("edit");
    wiki::edit(&mut store, "rust", "index", "Welcome!").expect("edit again");
    let page = wiki::page(&store, "rust", "index").expect("page");
    assert_eq!(page["content"], "Welcome!");
    assert_eq!(page["revision"], 2);
    assert_eq!(wiki::pages(&store, "rust").expect("pages"), json!(["faq", "index"]));
    assert_eq!(error_of(wiki::page(&store, "golang", "index")), "not_found");
}

#[test]
fn announcements_hide_and_read() {
    let mut store = RedditStore::init();
    for id in ["a1", "a2", "a3"] {
        store
            .db_mut()
            .announcements
            .push(object(json!({ "id": id, "title": id })));
    }

    announcements::hide(&mut store, &["a1"]).expect("hide");
    announcements::read(&mut store, &["a2", "missing"]).expect("read");
    assert_eq!(announcements::list(&store).expect("list").as_array().expect("list").len(), 2);
    let unread = announcements::unread(&store).expect("unread");
    assert_eq!(unread.as_array().expect("unread").len(), 1);
    assert_eq!(unread[0]["id"], "a3");

    announcements::read_all(&mut store).expect("read all");
    assert_eq!(announcements::unread(&store).expect("unread"), json!([]));
}

#[test]
fn modnotes_filter_by_subreddit() {
    let mut store = RedditStore::init();
    store.db_mut().modnotes.insert(
        "ferris".to_string(),
        vec![
            object(json!({ "id": "n1", "subreddit": "rust", "note": "helpful" })),
            object(json!({ "id": "n2", "subreddit": "golang", "note": "lost" })),
            object(json!({ "id": "n3", "note": "general" })),
        ],
    );

    let recent = modnotes::recent(&store, "ferris", "rust").expect("recent");
    let ids = recent["notes"]
        .as_array()
        .expect("notes")
        .iter()
        .map(|note| note["id"].as_str().expect("id").to_string())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["n1", "n3"]);

    modnotes::delete(&mut store, "ferris", "n1").expect("delete");
    assert_eq!(error_of(modnotes::delete(&mut store, "ferris", "n1")), "note_not_found");
}

#[test]
fn captcha_flag_and_unsimulated_endpoints() {
    let mut store = RedditStore::init();
    assert_eq!(reddit::needs_captcha(&store).expect("captcha"), json!(false));
    store.db_mut().captcha_needed = true;
    assert_eq!(reddit::needs_captcha(&store).expect("captcha"), json!(true));

    match unsimulated::call(Area::Modmail, "GET /api/mod/conversations") {
        Err(SimError::Unsupported(message)) => assert!(message.contains("modmail")),
        other => panic!("expected unsupported, got {other:?}"),
    }
    let reply = reddit::respond(unsimulated::call(Area::Account, "GET /api/v1/me"));
    assert!(reply["error"].as_str().expect("error").contains("not simulated"));
}

#[test]
fn missing_state_file_keeps_the_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut store = RedditStore::init();
    links::submit(&mut store, "rust", "link", "Docs", Some("https://doc.rust-lang.org")).expect("submit");

    store.load(&dir.path().join("absent.json")).expect("load");
    assert_eq!(store.db().links.len(), 1);

    let path = dir.path().join("reddit.json");
    store.save(&path).expect("save");
    let reopened = RedditStore::open(&path).expect("open");
    assert_eq!(reopened.db(), store.db());

    let next = {
        let mut reopened = reopened;
        links::submit(&mut reopened, "rust", "self", "Next", None).expect("submit")
    };
    assert_eq!(next["link_id"], "t3_2");
}
