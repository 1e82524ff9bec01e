use core::fmt::{self, Write as _};

use crate::{Balance, Links, SearchTree, TreeNode};

impl<T, S> SearchTree<T, S>
where
    T: TreeNode<Links<T>> + ?Sized,
    T::Key: fmt::Display,
    S: Balance,
{
    /// Writes the tree as a Graphviz `digraph` named `name`.
    ///
    /// Nodes are identified by their keys. The output is built only from the root and the
    /// [`edge_ids`](SearchTree::edge_ids) traversal. Quotes and backslashes in the graph name and
    /// in identifiers are escaped.
    pub fn dotgraph<W>(&self, name: &str, mut w: W) -> fmt::Result
    where
        W: fmt::Write,
    {
        let name = Quoted(name);
        let root = match self.root() {
            Some(r) => r,
            None => return write!(w, "digraph {name} {{}}"),
        };

        writeln!(w, "digraph {name} {{")?;
        writeln!(w, "  {};", Quoted(&root.key().to_string()))?;

        for (parent, child) in self.edge_ids() {
            writeln!(w, "  {} -> {};", Quoted(&parent), Quoted(&child))?;
        }

        w.write_str("}")
    }
}

// A Graphviz double-quoted string.
struct Quoted<'a>(&'a str);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('"')?;
        for ch in self.0.chars() {
            if matches!(ch, '"' | '\\') {
                f.write_char('\\')?;
            }
            f.write_char(ch)?;
        }
        f.write_char('"')
    }
}

#[cfg(test)]
mod tests {
    use crate::AvlSet;

    #[test]
    fn dotgraph_escapes_identifiers() {
        let set: AvlSet<String> = ["b", "a\"x", "c\\d"]
            .into_iter()
            .map(String::from)
            .collect();

        let mut out = String::new();
        set.dotgraph("say \"hi\"", &mut out).unwrap();
        assert_eq!(
            out,
            "digraph \"say \\\"hi\\\"\" {\n  \"b\";\n  \"b\" -> \"a\\\"x\";\n  \"b\" -> \"c\\\\d\";\n}"
        );
    }
}
