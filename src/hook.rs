//! Glue for running hook scripts around an HTTP exchange. The host performs the exchange itself and hands the
//! request or response to a [`Hook`], which exposes it to the script as `request` or `response`.

use std::{
    cell::RefCell,
    collections::BTreeMap,
    io::Write,
    path::PathBuf,
    rc::Rc,
};

use rustc_hash::FxHashMap;

use crate::{
    parser::parse_str,
    tree_walk_interpreter::{
        from_json, from_xml, Interpreter, Method, NativeMethod, Object, ObjectInstance,
        RuntimeError,
    },
    Error,
};

pub type Headers = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: Headers,
}

#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status_code: u16,
    pub status: String,
    pub headers: Headers,
    pub body: Vec<u8>,
}

fn headers_object(headers: &Headers) -> Object {
    Object::Instance(
        headers
            .iter()
            .map(|(name, values)| (name.clone(), Object::String(values.join(", "))))
            .collect(),
    )
}

pub fn request_object(request: &HttpRequest) -> ObjectInstance {
    let object = ObjectInstance::new();
    object.put("method", Object::from(request.method.as_str()));
    object.put("url", Object::from(request.url.as_str()));
    object.put("headers", headers_object(&request.headers));
    object
}

/// The response as seen by scripts. `json()` and `xml()` decode the body on their first call and return the same
/// value on every later call.
pub fn response_object(response: &HttpResponse) -> ObjectInstance {
    let body: Rc<[u8]> = response.body.as_slice().into();
    let object = ObjectInstance::new();
    object.put("status_code", Object::Number(f64::from(response.status_code)));
    object.put("status", Object::from(response.status.as_str()));
    object.put("headers", headers_object(&response.headers));
    object.put("json", decoder("json", body.clone(), from_json));
    object.put("xml", decoder("xml", body, from_xml));
    object
}

fn decoder(
    name: &'static str,
    body: Rc<[u8]>,
    decode: fn(&[u8]) -> Result<Object, RuntimeError>,
) -> Object {
    let cache: RefCell<Option<Object>> = RefCell::new(None);
    let method = NativeMethod::new(name, 0, move |_, _, _| {
        if let Some(decoded) = cache.borrow().as_ref() {
            return Ok(decoded.clone());
        }
        let decoded = if body.is_empty() {
            Object::Nil
        } else {
            decode(&body)?
        };
        *cache.borrow_mut() = Some(decoded.clone());
        Ok(decoded)
    });
    Object::Method(Method::Native(method))
}

/// Runs hook scripts, each in a fresh interpreter.
pub struct Hook {
    working_dir: PathBuf,
    stdout: Rc<RefCell<dyn Write>>,
}

impl Hook {
    pub fn new(working_dir: impl Into<PathBuf>, stdout: Rc<RefCell<dyn Write>>) -> Self {
        Self {
            working_dir: working_dir.into(),
            stdout,
        }
    }

    /// Runs a script before `request` is sent and returns what it exported.
    pub fn before(
        &self,
        source: &str,
        request: &HttpRequest,
    ) -> Result<FxHashMap<String, Object>, Error> {
        self.run(source, "request", request_object(request))
    }

    /// Runs a script after `response` was received and returns what it exported.
    pub fn after(
        &self,
        source: &str,
        response: &HttpResponse,
    ) -> Result<FxHashMap<String, Object>, Error> {
        self.run(source, "response", response_object(response))
    }

    fn run(
        &self,
        source: &str,
        name: &str,
        object: ObjectInstance,
    ) -> Result<FxHashMap<String, Object>, Error> {
        let program = parse_str(source)?;
        let mut interpreter = Interpreter::new(self.working_dir.clone(), self.stdout.clone());
        interpreter.declare(name, Object::Instance(object));
        interpreter.execute(&program)?;
        let exports = interpreter.into_exports();
        tracing::debug!(hook = name, exports = exports.len(), "hook finished");
        Ok(exports)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn hook() -> (Hook, Rc<RefCell<Vec<u8>>>) {
        let out = Rc::new(RefCell::new(Vec::new()));
        (Hook::new(".", out.clone()), out)
    }

    fn response(body: &str) -> HttpResponse {
        let mut headers = Headers::new();
        headers.insert(
            "Content-Type".to_string(),
            vec!["application/json".to_string()],
        );
        HttpResponse {
            status_code: 200,
            status: "200 OK".to_string(),
            headers,
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_request_object() {
        let mut headers = Headers::new();
        headers.insert(
            "Accept".to_string(),
            vec!["text/html".to_string(), "application/json".to_string()],
        );
        let object = Object::Instance(request_object(&HttpRequest {
            method: "GET".to_string(),
            url: "https://example.com".to_string(),
            headers,
        }));
        assert_eq!(
            object.to_string(),
            "Object {headers: Object {Accept: text/html, application/json}, method: GET, url: https://example.com}"
        );
    }

    #[test]
    fn test_before_hook_exports() {
        let (hook, out) = hook();
        let request = HttpRequest {
            method: "POST".to_string(),
            url: "https://example.com/users".to_string(),
            headers: Headers::new(),
        };
        let exports = hook
            .before(
                "print(request.method); export request.url + \"?page=2\" as url;",
                &request,
            )
            .unwrap();
        assert_eq!(exports["url"], Object::from("https://example.com/users?page=2"));
        assert_eq!(String::from_utf8(out.borrow().clone()).unwrap(), "POST");
    }

    #[test]
    fn test_after_hook_decodes_json_once() {
        let (hook, _) = hook();
        let exports = hook
            .after(
                "var first = response.json(); first.name = \"changed\"; export response.json().name as name; export response.status_code as code;",
                &response("{\"name\": \"crookdc\"}"),
            )
            .unwrap();
        assert_eq!(exports["name"], Object::from("changed"));
        assert_eq!(exports["code"], Object::Number(200.0));
    }

    #[test]
    fn test_empty_body_decodes_to_nil() {
        let (hook, _) = hook();
        let exports = hook
            .after("export response.json() as body;", &response(""))
            .unwrap();
        assert_eq!(exports["body"], Object::Nil);
    }

    #[test]
    fn test_xml_body() {
        let (hook, _) = hook();
        let exports = hook
            .after(
                "export response.xml().user.\"_attributes\".id as id;",
                &response("<users><user id=\"7\"/></users>"),
            )
            .unwrap();
        assert_eq!(exports["id"], Object::from("7"));
    }

    #[test]
    fn test_failures_reach_the_host() {
        let (hook, _) = hook();
        assert!(matches!(
            hook.after("response.json();", &response("not json")),
            Err(Error::Runtime(RuntimeError::Decode(_)))
        ));
        assert!(matches!(
            hook.before("var = 1;", &HttpRequest::default()),
            Err(Error::Parse(_))
        ));
    }
}
