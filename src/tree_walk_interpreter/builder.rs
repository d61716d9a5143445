use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};

use super::{
    object::{List, Object, ObjectInstance},
    RuntimeError,
};

fn decode_error(err: impl std::fmt::Display) -> RuntimeError {
    RuntimeError::Decode(err.to_string())
}

/// Decodes a JSON document into script objects.
pub fn from_json(bytes: &[u8]) -> Result<Object, RuntimeError> {
    let value: serde_json::Value = serde_json::from_slice(bytes).map_err(decode_error)?;
    Ok(json_object(value))
}

fn json_object(value: serde_json::Value) -> Object {
    match value {
        serde_json::Value::Null => Object::Nil,
        serde_json::Value::Bool(b) => Object::Boolean(b),
        serde_json::Value::Number(n) => n.as_f64().map_or(Object::Nil, Object::Number),
        serde_json::Value::String(s) => Object::String(s),
        serde_json::Value::Array(items) => {
            Object::List(List::new(items.into_iter().map(json_object).collect()))
        }
        serde_json::Value::Object(properties) => Object::Instance(
            properties
                .into_iter()
                .map(|(key, value)| (key, json_object(value)))
                .collect(),
        ),
    }
}

/// Decodes an XML document into script objects. Every element becomes an object holding its attributes under
/// `_attributes`, its text under `_inner` and its children under their local names, with repeated children
/// collected into a list.
pub fn from_xml(bytes: &[u8]) -> Result<Object, RuntimeError> {
    let mut reader = Reader::from_reader(bytes);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<ObjectInstance> = Vec::new();
    loop {
        match reader.read_event_into(&mut buf).map_err(decode_error)? {
            Event::Start(start) => {
                let (name, element) = element(&start)?;
                if let Some(parent) = stack.last() {
                    attach(parent, name, element.clone());
                }
                stack.push(element);
            }
            Event::Empty(start) => {
                let (name, element) = element(&start)?;
                match stack.last() {
                    Some(parent) => attach(parent, name, element),
                    None => return Ok(Object::Instance(element)),
                }
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(decode_error)?;
                if let Some(current) = stack.last() {
                    if !text.trim().is_empty() {
                        current.put("_inner", Object::String(text.into_owned()));
                    }
                }
            }
            Event::CData(data) => {
                let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                if let Some(current) = stack.last() {
                    current.put("_inner", Object::String(text));
                }
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| decode_error("unexpected closing tag"))?;
                if stack.is_empty() {
                    return Ok(Object::Instance(element));
                }
            }
            Event::Eof => return Err(decode_error("unexpected end of document")),
            _ => {}
        }
        buf.clear();
    }
}

fn element(start: &BytesStart) -> Result<(String, ObjectInstance), RuntimeError> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let attributes = ObjectInstance::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(decode_error)?;
        let key = String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned();
        let value = attribute.unescape_value().map_err(decode_error)?;
        attributes.put(key, Object::String(value.into_owned()));
    }
    let element = ObjectInstance::new();
    element.put("_attributes", Object::Instance(attributes));
    Ok((name, element))
}

fn attach(parent: &ObjectInstance, name: String, element: ObjectInstance) {
    match parent.get(&name) {
        Object::Nil => parent.put(name, Object::Instance(element)),
        Object::List(siblings) => siblings.push(Object::Instance(element)),
        existing => parent.put(
            name,
            Object::List(List::new(vec![existing, Object::Instance(element)])),
        ),
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn property(object: &Object, path: &[&str]) -> Object {
        path.iter().fold(object.clone(), |current, key| {
            current.get_property(key).expect("path should exist")
        })
    }

    #[test]
    fn test_json_document() {
        let object = from_json(
            br#"{"name": "crookdc", "age": 30, "admin": false, "manager": null, "tags": ["a", "b"], "address": {"city": "Stockholm"}}"#,
        )
        .unwrap();
        assert_eq!(property(&object, &["name"]), Object::from("crookdc"));
        assert_eq!(property(&object, &["age"]), Object::Number(30.0));
        assert_eq!(property(&object, &["admin"]), Object::Boolean(false));
        assert_eq!(property(&object, &["manager"]), Object::Nil);
        assert_eq!(property(&object, &["tags"]).to_string(), "[a,b]");
        assert_eq!(
            property(&object, &["address", "city"]),
            Object::from("Stockholm")
        );
    }

    #[test]
    fn test_json_top_level_array() {
        let object = from_json(b"[1, 2.5]").unwrap();
        assert_eq!(object.to_string(), "[1,2.5]");
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            from_json(b"{\"name\": "),
            Err(RuntimeError::Decode(_))
        ));
    }

    #[test]
    fn test_xml_document() {
        let object = from_xml(
            br#"<?xml version="1.0"?>
            <catalog region="eu">
                <book id="1"><title>Dune</title></book>
                <book id="2"><title>Emma</title></book>
                <owner name="crookdc"/>
                <note>  hello  </note>
            </catalog>"#,
        )
        .unwrap();

        assert_eq!(
            property(&object, &["_attributes", "region"]),
            Object::from("eu")
        );
        let Object::List(books) = property(&object, &["book"]) else {
            panic!("repeated elements should merge into a list");
        };
        assert_eq!(books.len(), 2);
        let second = books.get(1).unwrap();
        assert_eq!(property(&second, &["_attributes", "id"]), Object::from("2"));
        assert_eq!(property(&second, &["title", "_inner"]), Object::from("Emma"));
        assert_eq!(
            property(&object, &["owner", "_attributes", "name"]),
            Object::from("crookdc")
        );
        assert_eq!(property(&object, &["note", "_inner"]), Object::from("hello"));
    }

    #[test]
    fn test_xml_self_closing_root() {
        let object = from_xml(br#"<empty flag="yes"/>"#).unwrap();
        assert_eq!(
            property(&object, &["_attributes", "flag"]),
            Object::from("yes")
        );
    }

    #[test]
    fn test_xml_three_siblings() {
        let object = from_xml(b"<r><i>1</i><i>2</i><i>3</i></r>").unwrap();
        let Object::List(items) = property(&object, &["i"]) else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn test_truncated_xml() {
        assert!(matches!(
            from_xml(b"<root><child>"),
            Err(RuntimeError::Decode(_))
        ));
    }
}
