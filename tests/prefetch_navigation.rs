mod common;

use common::{Harness, Server, ENABLED};
use predictive_preload::fetch::FetchState;
use predictive_preload::navigation::{click, submit_form, visit_link};
use std::rc::Rc;

#[test]
fn click_after_hover_reuses_the_prefetch() {
  let mut h = Harness::new(ENABLED, r#"<a id="a" href="/next">next</a>"#);
  h.hover("a");
  assert_eq!(h.fetches(), 1);

  let a = h.el("a");
  let visit = click(&mut h.page, a).unwrap();
  assert!(visit.used_prefetch);
  assert_eq!(h.fetches(), 1);
  let body = visit.response().unwrap().text();
  assert!(body.contains("https://example.com/next"));
}

#[test]
fn navigation_adopts_an_in_flight_prefetch() {
  let mut h = Harness::new("", r#"<a id="a" href="/next">next</a>"#);
  let a = h.el("a");
  let prefetch = h.session.preloader().preload_anchor(&mut h.page, a).unwrap();
  assert!(!prefetch.is_finished());

  let visit = visit_link(&mut h.page, a).unwrap();
  assert!(visit.used_prefetch);
  assert!(Rc::ptr_eq(&visit.request, &prefetch));
  assert!(visit.is_finished());
  assert_eq!(h.fetches(), 1);
}

#[test]
fn consuming_one_entry_clears_every_entry() {
  let mut h = Harness::new(
    "",
    r#"<a id="a" href="/a" data-preload>a</a><a id="b" href="/b" data-preload>b</a>"#,
  );
  assert_eq!(h.session.cache().len(), 2);

  let a = h.el("a");
  let visit = visit_link(&mut h.page, a).unwrap();
  assert!(visit.used_prefetch);
  assert!(h.session.cache().is_empty());
  assert!(h.session.cache().get("https://example.com/b").is_none());

  // `b` was fresh, but it is gone: following it hits the network.
  let b = h.el("b");
  let visit = visit_link(&mut h.page, b).unwrap();
  assert!(!visit.used_prefetch);
  assert_eq!(h.fetches(), 3);
}

#[test]
fn uncached_navigation_fetches_normally() {
  let mut h = Harness::new("", r#"<a id="a" href="/a">a</a>"#);
  let a = h.el("a");
  let visit = visit_link(&mut h.page, a).unwrap();
  assert!(!visit.used_prefetch);
  let requests = h.server.requests();
  assert_eq!(requests.len(), 1);
  assert_eq!(requests[0].header("Sec-Purpose"), None);
}

#[test]
fn form_submission_never_uses_the_cache() {
  let mut h = Harness::new(
    "",
    r#"<a id="a" href="/search?q=rust" data-preload>search</a>
       <form id="f" action="/search"><input name="q" value="rust"></form>"#,
  );
  assert_eq!(h.fetches(), 1);

  let form = h.el("f");
  let visit = submit_form(&mut h.page, form).unwrap();
  assert_eq!(visit.url.as_str(), "https://example.com/search?q=rust");
  assert!(!visit.used_prefetch);
  assert_eq!(h.fetches(), 2);
  assert_eq!(h.session.cache().len(), 1);
}

#[test]
fn non_get_link_navigation_never_uses_the_cache() {
  let mut h = Harness::new(
    "",
    r#"<a id="get" href="/thing" data-preload>get</a>
       <a id="delete" href="/thing" data-method="delete">delete</a>"#,
  );
  let delete = h.el("delete");
  let visit = visit_link(&mut h.page, delete).unwrap();
  assert!(!visit.used_prefetch);
  assert_eq!(h.fetches(), 2);
  assert_eq!(h.session.cache().len(), 1);
}

#[test]
fn hover_prefetches_carry_purpose_and_frame_headers() {
  let mut h = Harness::new(
    ENABLED,
    r#"<content-frame id="results">
         <a id="next" href="/page/2">2</a>
         <a id="home" href="/home" data-frame="_top">home</a>
       </content-frame>
       <a id="panel" href="/panel" data-frame="details">panel</a>"#,
  );
  for id in ["next", "home", "panel"] {
    h.hover(id);
  }
  let requests = h.server.requests();
  assert_eq!(requests.len(), 3);
  for request in &requests {
    assert_eq!(request.header("Sec-Purpose"), Some("prefetch"));
  }
  let frames: Vec<(&str, Option<&str>)> = requests
    .iter()
    .map(|r| (r.url.as_str(), r.header("Content-Frame")))
    .collect();
  assert_eq!(
    frames,
    [
      ("https://example.com/page/2", Some("results")),
      ("https://example.com/home", None),
      ("https://example.com/panel", Some("details")),
    ]
  );
}

#[test]
fn eager_preload_skips_links_that_drive_a_frame() {
  let mut h = Harness::new(
    "",
    r#"<content-frame id="hello"><a href="/inner" data-preload>inner</a></content-frame>
       <a href="/targeted" data-frame="hello" data-preload>targeted</a>
       <content-frame id="menu"><a href="/top" data-frame="_top" data-preload>top</a></content-frame>"#,
  );
  assert_eq!(h.server.urls(), ["https://example.com/top"]);

  let menu = h.el("menu");
  h.page.dispatch_frame_load(menu);
  assert_eq!(
    h.server.urls(),
    ["https://example.com/top", "https://example.com/top"]
  );
}

#[test]
fn eager_preload_allows_new_window_targets() {
  let h = Harness::new("", r#"<a href="/report" target="_blank" data-preload>report</a>"#);
  assert_eq!(h.server.urls(), ["https://example.com/report"]);
}

#[test]
fn failed_prefetch_is_handed_over_as_is() {
  let server = Server::default().with_status("https://example.com/broken", 500);
  let mut h = Harness::with_server("", r#"<a id="a" href="/broken" data-preload>x</a>"#, server);
  assert_eq!(h.fetches(), 1);

  let a = h.el("a");
  let visit = visit_link(&mut h.page, a).unwrap();
  assert!(visit.used_prefetch);
  assert!(matches!(visit.request.state(), FetchState::Failed(_)));
  assert_eq!(visit.response().unwrap().status, Some(500));
  assert_eq!(h.fetches(), 1);
}

#[test]
fn stopping_the_session_drops_cached_prefetches() {
  let mut h = Harness::new("", r#"<a id="a" href="/a" data-preload>a</a>"#);
  assert_eq!(h.session.cache().len(), 1);
  h.session.stop(&mut h.page);
  assert!(h.session.cache().is_empty());

  let a = h.el("a");
  let visit = visit_link(&mut h.page, a).unwrap();
  assert!(!visit.used_prefetch);
  assert_eq!(h.fetches(), 2);
}
