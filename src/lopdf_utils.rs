use crate::pdf_object::PdfObjectDeref;
use crate::Error;
use lopdf::{Document, Object};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Rectangle {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Rectangle {
    pub fn width(&self) -> f64 {
        (self.x2 - self.x1).abs()
    }

    pub fn height(&self) -> f64 {
        (self.y2 - self.y1).abs()
    }
}

/// Integers and reals are both valid PDF numbers.
pub(crate) fn as_number(obj: &Object) -> Result<f64, Error> {
    match *obj {
        Object::Integer(value) => Ok(value as f64),
        Object::Real(value) => Ok(value as f64),
        _ => Err(Error::LoPdfError(lopdf::Error::Type)),
    }
}

/// Read a `[llx lly urx ury]` array, following references for the array and its items.
pub(crate) fn as_rectangle(obj: &Object, doc: &Document) -> Result<Rectangle, Error> {
    let list = obj.deref(doc)?.as_array()?;
    if list.len() < 4 {
        return Err(Error::Other(format!(
            "Rectangle needs 4 numbers, got {}.",
            list.len()
        )));
    }
    if list.len() > 4 {
        log::warn!("Rectangle has {} entries, ignoring the extra ones.", list.len());
    }
    Ok(Rectangle {
        x1: as_number(list[0].deref(doc)?)?,
        y1: as_number(list[1].deref(doc)?)?,
        x2: as_number(list[2].deref(doc)?)?,
        y2: as_number(list[3].deref(doc)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangle_from_mixed_numbers() {
        let doc = Document::with_version("1.7");
        let obj = Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(200.5),
            Object::Integer(800),
        ]);
        let rect = as_rectangle(&obj, &doc).unwrap();
        assert_eq!(rect.width(), 200.5);
        assert_eq!(rect.height(), 800.0);
    }

    #[test]
    fn rectangle_through_reference() {
        let mut doc = Document::with_version("1.7");
        let id = doc.add_object(Object::Array(vec![
            10.into(),
            20.into(),
            110.into(),
            220.into(),
        ]));
        let rect = as_rectangle(&Object::Reference(id), &doc).unwrap();
        assert_eq!((rect.width(), rect.height()), (100.0, 200.0));
    }

    #[test]
    fn short_rectangle_is_rejected() {
        let doc = Document::with_version("1.7");
        let obj = Object::Array(vec![0.into(), 0.into()]);
        assert!(as_rectangle(&obj, &doc).is_err());
        assert!(as_number(&Object::Null).is_err());
    }
}
