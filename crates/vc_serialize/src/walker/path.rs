use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Field(String),
    Index(usize),
}

/// Trail of the element being walked, rendered as `Scene.shapes[2].radius`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementPath {
    segments: Vec<Segment>,
}

impl ElementPath {
    pub const fn new() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    pub fn push_field(&mut self, name: &str) {
        self.segments.push(Segment::Field(name.into()));
    }

    pub fn push_index(&mut self, index: usize) {
        self.segments.push(Segment::Index(index));
    }

    pub fn pop(&mut self) {
        self.segments.pop();
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Field(name) if i == 0 => f.write_str(name)?,
                Segment::Field(name) => write!(f, ".{name}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ElementPath;
    use alloc::string::ToString;

    #[test]
    fn renders_fields_and_indices() {
        let mut path = ElementPath::new();
        path.push_field("Scene");
        path.push_field("shapes");
        path.push_index(2);
        path.push_field("radius");
        assert_eq!(path.to_string(), "Scene.shapes[2].radius");

        path.pop();
        path.pop();
        assert_eq!(path.to_string(), "Scene.shapes");
    }
}
