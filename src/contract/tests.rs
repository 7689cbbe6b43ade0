use super::attr::{Body, HeaderMap, Headers, Param, QueryMap, RequestLine};
use super::*;
use crate::template::CollectionFormat;
use http::Method;
use std::sync::Arc;

fn parse(interface: &InterfaceDescriptor) -> Result<Vec<MethodMetadata>> {
    DefaultContract::new().parse_and_validate(interface)
}

fn parse_one(method: MethodDescriptor) -> Result<MethodMetadata> {
    let interface = InterfaceDescriptor::new("Api").method(method);
    parse(&interface).map(|mut all| all.remove(0))
}

fn config_error(result: Result<impl std::fmt::Debug>) -> String {
    match result {
        Err(Error::ConfigurationError(message)) => message,
        other => panic!("expected configuration error, got {other:?}"),
    }
}

fn string_param(name: &str) -> ParamDescriptor {
    ParamDescriptor::new(TypeRef::string()).attribute(Param::new(name))
}

#[test]
fn request_line_sets_method_uri_and_placeholders() {
    let data = parse_one(
        MethodDescriptor::new("find")
            .attribute(RequestLine::new("GET /users/{id}?active={flag}"))
            .param(string_param("id"))
            .param(ParamDescriptor::new(TypeRef::named("bool")).attribute(Param::new("flag")))
            .returns(TypeRef::named("User")),
    )
    .unwrap();

    assert_eq!(data.config_key(), "Api#find(String,bool)");
    assert_eq!(data.template().method(), Some(&Method::GET));
    assert_eq!(data.template().url(), "/users/{id}?active={flag}");
    assert_eq!(data.index_to_name()[&0], vec!["id"]);
    assert_eq!(data.index_to_name()[&1], vec!["flag"]);
    assert_eq!(data.body_index(), None);
    assert!(data.form_params().is_empty());
}

#[test]
fn parsing_is_deterministic() {
    let interface = InterfaceDescriptor::new("Api").method(
        MethodDescriptor::new("find")
            .attribute(RequestLine::new("GET /users/{id}"))
            .param(string_param("id")),
    );
    let first = parse(&interface).unwrap();
    let second = parse(&interface).unwrap();

    assert_eq!(first[0].index_to_name(), second[0].index_to_name());
    assert_eq!(first[0].template(), second[0].template());
    assert_eq!(first[0].body_index(), second[0].body_index());
    assert_eq!(first[0].is_ignored(), second[0].is_ignored());
}

#[test]
fn missing_verb_is_a_configuration_error() {
    let message = config_error(parse_one(MethodDescriptor::new("nothing")));
    let expected = "Method nothing not annotated with HTTP method type (ex. GET, POST)";
    assert!(message.starts_with(expected));
}

#[test]
fn unknown_verb_is_rejected() {
    let message = config_error(parse_one(
        MethodDescriptor::new("fetch").attribute(RequestLine::new("FETCH /x")),
    ));
    assert!(message.contains("didn't start with an HTTP verb"));

    let message = config_error(parse_one(
        MethodDescriptor::new("blank").attribute(RequestLine::new("  ")),
    ));
    assert!(message.contains("RequestLine annotation was empty on method blank"));
}

#[test]
fn unannotated_parameter_becomes_the_body() {
    let data = parse_one(
        MethodDescriptor::new("create")
            .attribute(RequestLine::new("POST /users"))
            .param(ParamDescriptor::new(TypeRef::named("User"))),
    )
    .unwrap();

    assert_eq!(data.body_index(), Some(0));
    assert_eq!(data.body_type(), Some(&TypeRef::named("User")));
}

#[test]
fn two_body_parameters_are_rejected() {
    let message = config_error(parse_one(
        MethodDescriptor::new("create")
            .attribute(RequestLine::new("POST /users"))
            .param(ParamDescriptor::new(TypeRef::named("User")))
            .param(ParamDescriptor::new(TypeRef::named("User"))),
    ));
    assert!(message.starts_with("Method has too many Body parameters: Api#create(User,User)"));
}

#[test]
fn form_parameter_then_body_is_rejected() {
    let message = config_error(parse_one(
        MethodDescriptor::new("login")
            .attribute(RequestLine::new("POST /login"))
            .param(string_param("user"))
            .param(ParamDescriptor::new(TypeRef::named("Extra"))),
    ));
    assert!(message.starts_with("Body parameters cannot be used with form parameters."));
}

#[test]
fn body_then_form_parameter_is_rejected() {
    let message = config_error(parse_one(
        MethodDescriptor::new("login")
            .attribute(RequestLine::new("POST /login"))
            .param(ParamDescriptor::new(TypeRef::named("Extra")))
            .param(string_param("user")),
    ));
    assert!(message.starts_with("Body parameters cannot be used with form parameters."));
}

#[test]
fn params_not_in_the_request_become_form_params() {
    let data = parse_one(
        MethodDescriptor::new("login")
            .attribute(RequestLine::new("POST /login/{tenant}"))
            .attribute(Body("user={user}&password={password}".to_string()))
            .param(string_param("tenant"))
            .param(string_param("user"))
            .param(string_param("password")),
    )
    .unwrap();

    assert_eq!(data.form_params(), &["user".to_string(), "password".to_string()]);
    assert_eq!(data.body_index(), None);
    assert_eq!(
        data.template().body_template().as_deref(),
        Some("user={user}&password={password}")
    );
}

#[test]
fn literal_body_is_kept_verbatim() {
    let data = parse_one(
        MethodDescriptor::new("ping")
            .attribute(RequestLine::new("POST /ping"))
            .attribute(Body("ping".to_string())),
    )
    .unwrap();
    assert_eq!(data.template().body_text().as_deref(), Some("ping"));
    assert_eq!(data.template().body_template(), None);
}

#[test]
fn uri_and_options_parameters_are_not_bodies() {
    let data = parse_one(
        MethodDescriptor::new("get")
            .attribute(RequestLine::new("GET /x"))
            .param(ParamDescriptor::new(TypeRef::uri()))
            .param(ParamDescriptor::new(TypeRef::options())),
    )
    .unwrap();

    assert_eq!(data.url_index(), Some(0));
    assert_eq!(data.body_index(), None);
}

#[test]
fn request_line_flags_are_applied() {
    let data = parse_one(
        MethodDescriptor::new("get").attribute(
            RequestLine::new("GET /files/{path}")
                .decode_slash(false)
                .collection_format(CollectionFormat::Csv),
        ),
    )
    .unwrap();

    assert!(!data.template().decode_slash());
    assert_eq!(data.template().collection_format(), CollectionFormat::Csv);
}

#[test]
fn query_and_header_maps_are_recorded_once() {
    let map = TypeRef::map(TypeRef::string(), TypeRef::named("Value"));
    let data = parse_one(
        MethodDescriptor::new("search")
            .attribute(RequestLine::new("GET /search"))
            .param(ParamDescriptor::new(map.clone()).attribute(QueryMap { encoded: true }))
            .param(ParamDescriptor::new(map.clone()).attribute(HeaderMap)),
    )
    .unwrap();
    assert_eq!(data.query_map_index(), Some(0));
    assert!(data.query_map_encoded());
    assert_eq!(data.header_map_index(), Some(1));

    let message = config_error(parse_one(
        MethodDescriptor::new("search")
            .attribute(RequestLine::new("GET /search"))
            .param(ParamDescriptor::new(map.clone()).attribute(QueryMap::default()))
            .param(ParamDescriptor::new(map).attribute(QueryMap::default())),
    ));
    assert_eq!(message, "QueryMap annotation was present on multiple parameters.");
}

#[test]
fn bulk_map_keys_must_be_strings() {
    let message = config_error(parse_one(
        MethodDescriptor::new("search")
            .attribute(RequestLine::new("GET /search"))
            .param(
                ParamDescriptor::new(TypeRef::map(TypeRef::named("i32"), TypeRef::string()))
                    .attribute(HeaderMap),
            ),
    ));
    assert_eq!(message, "HeaderMap key must be a String: i32");

    let message = config_error(parse_one(
        MethodDescriptor::new("search")
            .attribute(RequestLine::new("GET /search"))
            .param(ParamDescriptor::new(TypeRef::named("Filter")).attribute(HeaderMap)),
    ));
    assert_eq!(message, "HeaderMap parameter must be a Map: Filter");

    // Query maps may be records flattened by the query map encoder.
    parse_one(
        MethodDescriptor::new("search")
            .attribute(RequestLine::new("GET /search"))
            .param(ParamDescriptor::new(TypeRef::named("Filter")).attribute(QueryMap::default())),
    )
    .unwrap();
}

#[test]
fn class_headers_are_inherited_and_replaced() {
    let parent = Arc::new(
        InterfaceDescriptor::new("Base")
            .attribute(Headers::new(["Accept: text/plain", "X-Base: 1"]))
            .method(MethodDescriptor::new("ping").attribute(RequestLine::new("GET /ping"))),
    );
    let child = InterfaceDescriptor::new("Child")
        .extends(parent, vec![])
        .attribute(Headers::new(["Accept: application/json"]))
        .method(
            MethodDescriptor::new("pong")
                .attribute(RequestLine::new("GET /pong"))
                .attribute(Headers::new(["Accept: text/html", "X-Method: {v}"])),
        );

    let parsed = parse(&child).unwrap();
    assert_eq!(parsed.len(), 2);
    assert_eq!(parsed[0].config_key(), "Child#ping()");

    let ping = parsed[0].template().headers();
    assert_eq!(ping.get("accept").unwrap(), &["application/json".to_string()]);
    assert_eq!(ping.first("X-Base"), Some("1"));

    let pong = parsed[1].template().headers();
    assert_eq!(
        pong.get("Accept").unwrap(),
        &["application/json".to_string(), "text/html".to_string()]
    );
    assert_eq!(pong.first("X-Method"), Some("{v}"));
}

#[test]
fn empty_headers_are_rejected() {
    let interface = InterfaceDescriptor::new("Api")
        .attribute(Headers(vec![]))
        .method(MethodDescriptor::new("ping").attribute(RequestLine::new("GET /ping")));
    assert_eq!(
        config_error(parse(&interface)),
        "Headers annotation was empty on type Api."
    );
}

#[test]
fn parent_generics_are_resolved() {
    let parent = Arc::new(
        InterfaceDescriptor::new("Crud")
            .type_param("T")
            .method(
                MethodDescriptor::new("get")
                    .attribute(RequestLine::new("GET /{id}"))
                    .param(string_param("id"))
                    .returns(TypeRef::var("T")),
            ),
    );
    let child = InterfaceDescriptor::new("Users").extends(parent, vec![TypeRef::named("User")]);

    let parsed = parse(&child).unwrap();
    assert_eq!(parsed[0].return_type(), &TypeRef::named("User"));
    assert_eq!(parsed[0].config_key(), "Users#get(String)");
}

#[test]
fn unresolved_type_variables_are_rejected() {
    let own = InterfaceDescriptor::new("Api").method(
        MethodDescriptor::new("get")
            .attribute(RequestLine::new("GET /thing"))
            .returns(TypeRef::list(TypeRef::var("T"))),
    );
    assert_eq!(
        config_error(parse(&own)),
        "Unresolved type variable in Api#get: List<T>"
    );

    let parent = Arc::new(
        InterfaceDescriptor::new("Store").type_param("T").method(
            MethodDescriptor::new("put")
                .attribute(RequestLine::new("PUT /items"))
                .param(ParamDescriptor::new(TypeRef::var("U"))),
        ),
    );
    let child = InterfaceDescriptor::new("Items").extends(parent, vec![TypeRef::named("Item")]);
    assert_eq!(
        config_error(parse(&child)),
        "Unresolved type variable in Items#put: U"
    );
}

#[test]
fn inheritance_shapes_are_validated() {
    let generic = InterfaceDescriptor::new("Generic").type_param("T");
    assert_eq!(
        config_error(parse(&generic)),
        "Parameterized types unsupported: Generic"
    );

    let a = Arc::new(InterfaceDescriptor::new("A"));
    let b = Arc::new(InterfaceDescriptor::new("B"));
    let multiple = InterfaceDescriptor::new("C")
        .extends(a.clone(), vec![])
        .extends(b, vec![]);
    assert_eq!(
        config_error(parse(&multiple)),
        "Only single inheritance supported: C"
    );

    let middle = Arc::new(InterfaceDescriptor::new("Middle").extends(a, vec![]));
    let nested = InterfaceDescriptor::new("Leaf").extends(middle, vec![]);
    assert_eq!(
        config_error(parse(&nested)),
        "Only single-level inheritance supported: Leaf"
    );
}

#[test]
fn duplicate_method_identity_is_rejected() {
    let parent = Arc::new(
        InterfaceDescriptor::new("Base")
            .method(MethodDescriptor::new("ping").attribute(RequestLine::new("GET /a"))),
    );
    let child = InterfaceDescriptor::new("Child")
        .extends(parent, vec![])
        .method(MethodDescriptor::new("ping").attribute(RequestLine::new("GET /b")));

    assert_eq!(
        config_error(parse(&child)),
        "Overrides unsupported: Child#ping()"
    );
}

#[test]
fn non_abstract_methods_are_skipped() {
    let interface = InterfaceDescriptor::new("Api")
        .method(MethodDescriptor::new("ping").attribute(RequestLine::new("GET /ping")))
        .method(MethodDescriptor::new("helper").kind(MethodKind::Default))
        .method(MethodDescriptor::new("to_string").kind(MethodKind::Identity))
        .method(MethodDescriptor::new("create").kind(MethodKind::Static));

    let parsed = parse(&interface).unwrap();
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed[0].method_name(), "ping");
}

#[derive(Debug)]
struct Unknown;

#[test]
fn unused_attributes_become_warnings() {
    let interface = InterfaceDescriptor::new("Api").attribute(Unknown).method(
        MethodDescriptor::new("ping")
            .attribute(RequestLine::new("GET /ping"))
            .attribute(Unknown)
            .param(ParamDescriptor::named("flag", TypeRef::options()).attribute(Unknown)),
    );

    let parsed = parse(&interface).unwrap();
    let warnings = parsed[0].warnings();
    assert_eq!(
        warnings,
        &[
            "Class Api has annotations [Unknown] that are not used by contract DefaultContract"
                .to_string(),
            "Method ping has an annotation Unknown that is not used by contract DefaultContract"
                .to_string(),
            "Parameter flag has annotations [Unknown] that are not used by contract DefaultContract"
                .to_string(),
        ]
    );
}

#[test]
fn warnings_are_appended_to_errors() {
    let message = config_error(parse_one(MethodDescriptor::new("nothing").attribute(Unknown)));
    let class_warning = "Class Api has no annotations, it may affect contract DefaultContract";
    assert!(message.contains(class_warning));
    assert!(message.contains("Method nothing has an annotation Unknown"));
}

#[test]
fn declarative_contract_can_ignore_methods() {
    struct Internal;

    let mut contract = DeclarativeContract::new("Custom");
    contract
        .register_method_attribute::<RequestLine, _>(|data, line, _method| {
            data.template_mut()
                .set_method(Method::GET)
                .set_uri(line.line.trim_start_matches("GET "));
            Ok(())
        })
        .register_method_attribute::<Internal, _>(|data, _internal, _method| {
            data.ignore_method();
            Ok(())
        });

    let interface = InterfaceDescriptor::new("Api")
        .method(MethodDescriptor::new("visible").attribute(RequestLine::new("GET /v")))
        .method(MethodDescriptor::new("hidden").attribute(Internal));

    let parsed = contract.parse_and_validate(&interface).unwrap();
    assert_eq!(parsed.len(), 2);
    assert!(!parsed[0].is_ignored());
    assert!(parsed[1].is_ignored());
}

#[test]
fn ignored_parameters_never_become_the_body() {
    struct Context;

    let mut contract = DeclarativeContract::new("Custom");
    contract
        .register_method_attribute::<RequestLine, _>(|data, line, _method| {
            data.template_mut()
                .set_method(Method::POST)
                .set_uri(line.line.trim_start_matches("POST "));
            Ok(())
        })
        .register_parameter_attribute::<Context, _>(|data, _context, index| {
            data.ignore_param(index);
            Ok(())
        });

    let interface = InterfaceDescriptor::new("Api").method(
        MethodDescriptor::new("send")
            .attribute(RequestLine::new("POST /messages"))
            .param(ParamDescriptor::new(TypeRef::named("Context")).attribute(Context))
            .param(ParamDescriptor::new(TypeRef::named("Message"))),
    );

    let parsed = contract.parse_and_validate(&interface).unwrap();
    assert!(parsed[0].is_param_ignored(0));
    assert!(!parsed[0].is_param_ignored(1));
    assert_eq!(parsed[0].body_index(), Some(1));
}

#[test]
fn guarded_processors_only_see_matching_attributes() {
    let mut contract = DeclarativeContract::new("Guarded");
    contract.register_method_attribute_when::<RequestLine, _, _>(
        |line| line.line.starts_with("GET"),
        |data, line, _method| {
            data.template_mut()
                .set_method(Method::GET)
                .set_uri(&line.line[3..]);
            Ok(())
        },
    );

    let interface = InterfaceDescriptor::new("Api")
        .method(MethodDescriptor::new("post").attribute(RequestLine::new("POST /x")));
    let message = config_error(contract.parse_and_validate(&interface));
    let expected = "Method post has an annotation RequestLine that is not used by contract Guarded";
    assert!(message.contains(expected));
}
