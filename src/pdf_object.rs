use crate::Error;
use lopdf::{Dictionary, Document, Object, ObjectId};

/// Follow indirect references inside the document graph.
pub(crate) trait PdfObjectDeref {
    fn deref<'a>(&'a self, doc: &'a Document) -> Result<&'a Object, Error>;

    fn deref_dict<'a>(&'a self, doc: &'a Document) -> Result<&'a Dictionary, Error> {
        Ok(self.deref(doc)?.as_dict()?)
    }

    fn get_object_id(&self) -> Option<ObjectId>;
}

impl PdfObjectDeref for Object {
    fn deref<'a>(&'a self, doc: &'a Document) -> Result<&'a Object, Error> {
        // Chains of references are legal, but a cycle is not.
        let mut current = self;
        for _ in 0..32 {
            match *current {
                Object::Reference(oid) => {
                    current = doc.objects.get(&oid).ok_or_else(|| {
                        Error::Other(format!("PDF Error: NoSuchReference({:?})", oid))
                    })?;
                }
                _ => return Ok(current),
            }
        }
        Err(Error::Other("PDF Error: reference chain too deep".to_owned()))
    }

    fn get_object_id(&self) -> Option<ObjectId> {
        match *self {
            Object::Reference(ref id) => Some(*id),
            _ => None,
        }
    }
}
