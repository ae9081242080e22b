//! The runtime support block emitted into every generated file.
//!
//! Generated routines report violations through two small types, declared
//! once per file so the output is self-contained: `ConstraintViolation`, and
//! `Path` — an append-only byte buffer with a `Write`/`TruncateRight` pair.
//! One `Path` is shared by reference through nested `Validate` recursion, so
//! pushing and popping a segment costs only that segment's length and the
//! backing buffer is reused across the whole traversal.

/// Host-language source for the support declarations.
pub const SUPPORT: &str = r#"// ConstraintViolation describes where and how a value failed validation.
type ConstraintViolation struct {
	Path     string                 `json:"path"`
	PathKind string                 `json:"path_kind"`
	Message  string                 `json:"message"`
	Details  map[string]interface{} `json:"details,omitempty"`
}

// Path is used to represent the current position in a structure, to output a
// useful field value to identify where a ConstraintViolation occurred.
type Path struct {
	buf []byte
}

// NewPath returns a new Path instance.
func NewPath() *Path {
	return &Path{buf: make([]byte, 0, 32)}
}

// Write appends the given string to the end of the internal buffer, and
// returns the number of bytes written so the caller can truncate them later.
func (p *Path) Write(in string) int {
	p.buf = append(p.buf, in...)
	return len(in)
}

// TruncateRight cuts n bytes off of the end of the buffer. The backing array
// does not shrink, so that memory is re-used by later writes.
func (p *Path) TruncateRight(n int) {
	p.buf = p.buf[:len(p.buf)-n]
}

// String renders this path as a string.
func (p *Path) String() string {
	return string(p.buf)
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn support_block_declares_both_types() {
        assert!(SUPPORT.contains("type ConstraintViolation struct"));
        assert!(SUPPORT.contains("type Path struct"));
        assert!(SUPPORT.contains("func (p *Path) Write(in string) int"));
        assert!(SUPPORT.contains("func (p *Path) TruncateRight(n int)"));
    }
}
