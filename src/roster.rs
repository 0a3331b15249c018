/// The fixed list of students eligible for a roll-call, in configured order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    students: Vec<String>,
}

impl Roster {
    /// Blank and repeated names are dropped; first occurrence wins.
    pub fn new(students: Vec<String>) -> Self {
        let mut out: Vec<String> = Vec::with_capacity(students.len());
        for name in students {
            if name.trim().is_empty() || out.contains(&name) {
                continue;
            }
            out.push(name);
        }
        Self { students: out }
    }

    pub fn students(&self) -> &[String] {
        &self.students
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.students.iter().any(|s| s == name)
    }

    /// Alphabetical order for the entry form.
    pub fn sorted(&self) -> Vec<String> {
        let mut names = self.students.clone();
        names.sort();
        names
    }
}
