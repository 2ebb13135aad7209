//! Static column dictionary for CAGED movement files.
//!
//! Each record attribute lists the source headers it accepts (cleaned-CSV
//! snake case and raw CAGED spellings) and the Portuguese display name the
//! charts use. Header matching ignores case, accents, spaces and underscores.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    State,
    City,
    Age,
    Race,
    Occupation,
    Category,
    Education,
    Gender,
    EmployerType,
    EstablishmentType,
    MovementType,
    Disability,
    Intermittent,
    Partial,
    Salary,
    Section,
    FixedSalary,
    DeclaredYear,
    DeclaredMonth,
    ExclusionYear,
    ExclusionMonth,
    Balance,
}

impl Column {
    pub const ALL: [Column; 22] = [
        Column::State,
        Column::City,
        Column::Age,
        Column::Race,
        Column::Occupation,
        Column::Category,
        Column::Education,
        Column::Gender,
        Column::EmployerType,
        Column::EstablishmentType,
        Column::MovementType,
        Column::Disability,
        Column::Intermittent,
        Column::Partial,
        Column::Salary,
        Column::Section,
        Column::FixedSalary,
        Column::DeclaredYear,
        Column::DeclaredMonth,
        Column::ExclusionYear,
        Column::ExclusionMonth,
        Column::Balance,
    ];

    /// Normalised header spellings accepted for this column.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Column::State => &["uf", "siglauf", "estado"],
            Column::City => &["municipio", "cidade", "nomemunicipio"],
            Column::Age => &["idade"],
            Column::Race => &["racacor", "raca"],
            Column::Occupation => &["cbo2002ocupacao", "cboocupacao", "ocupacao"],
            Column::Category => &["categoria"],
            Column::Education => &["graudeinstrucao", "grauinstrucao", "escolaridade"],
            Column::Gender => &["sexo", "genero"],
            Column::EmployerType => &["tipoempregador"],
            Column::EstablishmentType => &["tipoestabelecimento"],
            Column::MovementType => &["tipomovimentacao"],
            Column::Disability => &["tipodedeficiencia", "tipodeficiencia"],
            Column::Intermittent => &["indtrabintermitente", "trabalhointermitente"],
            Column::Partial => &["indtrabparcial", "trabalhoparcial"],
            Column::Salary => &["salario"],
            Column::Section => &["secao", "secaoatividade"],
            Column::FixedSalary => &["valorsalariofixo"],
            Column::DeclaredYear => &["anodeclarado", "ano"],
            Column::DeclaredMonth => &["mesdeclarado", "mes"],
            Column::ExclusionYear => &["anoexclusao"],
            Column::ExclusionMonth => &["mesexclusao"],
            Column::Balance => &["saldomovimentacao", "saldo"],
        }
    }

    /// Display name shown on chart axes and legends.
    pub fn display_name(self) -> &'static str {
        match self {
            Column::State => "UF",
            Column::City => "Município",
            Column::Age => "Idade",
            Column::Race => "Raça/Cor",
            Column::Occupation => "Ocupação (CBO 2002)",
            Column::Category => "Categoria",
            Column::Education => "Grau de Instrução",
            Column::Gender => "Sexo",
            Column::EmployerType => "Tipo de Empregador",
            Column::EstablishmentType => "Tipo de Estabelecimento",
            Column::MovementType => "Tipo de Movimentação",
            Column::Disability => "Tipo de Deficiência",
            Column::Intermittent => "Trabalho Intermitente",
            Column::Partial => "Trabalho Parcial",
            Column::Salary => "Salário",
            Column::Section => "Seção",
            Column::FixedSalary => "Valor Salário Fixo",
            Column::DeclaredYear => "Ano Declarado",
            Column::DeclaredMonth => "Mês Declarado",
            Column::ExclusionYear => "Ano de Exclusão",
            Column::ExclusionMonth => "Mês de Exclusão",
            Column::Balance => "Saldo Movimentação",
        }
    }

    /// A record cannot be built without these.
    pub fn is_required(self) -> bool {
        matches!(
            self,
            Column::City | Column::Gender | Column::Section | Column::DeclaredYear | Column::Balance
        )
    }

    pub fn matches_header(self, header: &str) -> bool {
        let normalised = normalise_header(header);
        self.aliases().iter().any(|alias| *alias == normalised)
    }
}

/// Replace Portuguese accented letters with their ASCII base letter.
pub fn fold_accents(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
            'é' | 'ê' | 'è' => 'e',
            'É' | 'Ê' | 'È' => 'E',
            'í' | 'î' => 'i',
            'Í' | 'Î' => 'I',
            'ó' | 'ô' | 'õ' | 'ö' => 'o',
            'Ó' | 'Ô' | 'Õ' | 'Ö' => 'O',
            'ú' | 'ü' => 'u',
            'Ú' | 'Ü' => 'U',
            'ç' => 'c',
            'Ç' => 'C',
            other => other,
        })
        .collect()
}

/// Lowercase, fold accents and drop everything that is not alphanumeric.
pub fn normalise_header(header: &str) -> String {
    fold_accents(header.trim_start_matches('\u{feff}'))
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_match_regardless_of_accents_and_case() {
        assert!(Column::City.matches_header("município"));
        assert!(Column::City.matches_header("Municipio"));
        assert!(Column::Race.matches_header("raça_cor"));
        assert!(Column::Balance.matches_header("saldomovimentação"));
        assert!(Column::DeclaredYear.matches_header("ano_declarado"));
        assert!(!Column::DeclaredYear.matches_header("ano_exclusao"));
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        assert!(Column::State.matches_header("\u{feff}uf"));
    }

    #[test]
    fn every_alias_belongs_to_exactly_one_column() {
        for column in Column::ALL {
            for alias in column.aliases() {
                let owners = Column::ALL
                    .iter()
                    .filter(|other| other.matches_header(alias))
                    .count();
                assert_eq!(owners, 1, "alias {alias} is ambiguous");
            }
        }
    }
}
