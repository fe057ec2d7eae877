//! Static registry of lease contract templates.
//!
//! Bodies are compiled in from `static/templates/<id>.txt`.

use std::sync::LazyLock;

use super::fields::extract_fields;

/// A contract skeleton with `[FIELD_NAME]` placeholders.
#[derive(Debug)]
pub struct Template {
    pub id: &'static str,
    pub name: &'static str,
    pub body: &'static str,
    fields: Vec<String>,
}

impl Template {
    fn new(
        id: &'static str,
        name: &'static str,
        explicit_fields: &[&'static str],
        body: &'static str,
    ) -> Self {
        let mut fields: Vec<String> = explicit_fields.iter().map(|f| f.to_string()).collect();
        for derived in extract_fields(body) {
            if !fields.contains(&derived) {
                fields.push(derived);
            }
        }

        Self {
            id,
            name,
            body,
            fields,
        }
    }

    /// Ordered, de-duplicated field names: the curated list first, then any
    /// placeholder of the body the curated list does not mention.
    pub fn field_names(&self) -> &[String] {
        &self.fields
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }
}

pub const RESIDENTIAL_PERSON: &str = "residencial_pf";
pub const COMMERCIAL_COMPANY: &str = "comercial_pj";
pub const PROPERTY_MANAGEMENT: &str = "administracao_imobiliaria";
pub const RURAL_PERSON: &str = "rural_pf";
pub const RURAL_COMPANY: &str = "rural_pj";

const LANDLORD_PERSON_FIELDS: &[&str] = &[
    "NOME_LOCADOR", "CPF_LOCADOR", "RG_LOCADOR", "PROFISSAO_LOCADOR",
    "CEP_LOCADOR", "ENDERECO_LOCADOR", "NUMERO_LOCADOR", "COMPLEMENTO_LOCADOR",
    "BAIRRO_LOCADOR", "CIDADE_LOCADOR", "ESTADO_LOCADOR",
    "EMAIL_LOCADOR", "TELEFONE_LOCADOR",
];

const PROPERTY_FIELDS: &[&str] = &[
    "CEP_IMOVEL", "ENDERECO_IMOVEL", "NUMERO_IMOVEL", "COMPLEMENTO_IMOVEL",
    "BAIRRO_IMOVEL", "CIDADE_IMOVEL", "ESTADO_IMOVEL",
];

const AGENCY_FIELDS: &[&str] = &[
    "NOME_IMOBILIARIA", "CNPJ_IMOBILIARIA", "CRECI_IMOBILIARIA",
    "CEP_IMOBILIARIA", "ENDERECO_IMOBILIARIA", "NUMERO_IMOBILIARIA",
    "BAIRRO_IMOBILIARIA", "CIDADE_IMOBILIARIA", "ESTADO_IMOBILIARIA",
];

const RURAL_LANDLORD_FIELDS: &[&str] = &[
    "NOME_LOCADOR", "CPF_LOCADOR", "RG_LOCADOR",
    "CEP_LOCADOR", "ENDERECO_LOCADOR", "NUMERO_LOCADOR",
    "BAIRRO_LOCADOR", "CIDADE_LOCADOR", "ESTADO_LOCADOR",
];

fn concat_fields(groups: &[&[&'static str]]) -> Vec<&'static str> {
    groups.iter().flat_map(|group| group.iter().copied()).collect()
}

static TEMPLATES: LazyLock<Vec<Template>> = LazyLock::new(|| {
    vec![
        Template::new(
            RESIDENTIAL_PERSON,
            "Locação Residencial - Proprietário x Pessoa Física",
            &concat_fields(&[
                LANDLORD_PERSON_FIELDS,
                &[
                    "NOME_LOCATARIO", "CPF_LOCATARIO", "RG_LOCATARIO", "PROFISSAO_LOCATARIO",
                    "CEP_LOCATARIO", "ENDERECO_LOCATARIO", "NUMERO_LOCATARIO",
                    "COMPLEMENTO_LOCATARIO", "BAIRRO_LOCATARIO", "CIDADE_LOCATARIO",
                    "ESTADO_LOCATARIO", "EMAIL_LOCATARIO", "TELEFONE_LOCATARIO",
                ],
                PROPERTY_FIELDS,
                &[
                    "DESCRICAO_IMOVEL", "VALOR_ALUGUEL", "DIA_VENCIMENTO",
                    "PRAZO_CONTRATO", "DATA_INICIO", "DATA_FIM", "INDICE_REAJUSTE",
                ],
            ]),
            include_str!("../../static/templates/residencial_pf.txt"),
        ),
        Template::new(
            COMMERCIAL_COMPANY,
            "Locação Comercial - Proprietário x Pessoa Jurídica",
            &concat_fields(&[
                LANDLORD_PERSON_FIELDS,
                &[
                    "RAZAO_SOCIAL_LOCATARIO", "CNPJ_LOCATARIO", "INSCRICAO_ESTADUAL",
                    "REPRESENTANTE_LEGAL", "CPF_REPRESENTANTE", "RG_REPRESENTANTE",
                    "CEP_LOCATARIO", "ENDERECO_LOCATARIO", "NUMERO_LOCATARIO",
                    "COMPLEMENTO_LOCATARIO", "BAIRRO_LOCATARIO", "CIDADE_LOCATARIO",
                    "ESTADO_LOCATARIO", "EMAIL_LOCATARIO", "TELEFONE_LOCATARIO",
                ],
                PROPERTY_FIELDS,
                &[
                    "DESCRICAO_IMOVEL", "AREA_IMOVEL", "VALOR_ALUGUEL", "DIA_VENCIMENTO",
                    "PRAZO_CONTRATO", "DATA_INICIO", "DATA_FIM", "INDICE_REAJUSTE",
                ],
            ]),
            include_str!("../../static/templates/comercial_pj.txt"),
        ),
        Template::new(
            PROPERTY_MANAGEMENT,
            "Administração de Imóvel - Imobiliária x Locador",
            &concat_fields(&[
                AGENCY_FIELDS,
                &[
                    "EMAIL_IMOBILIARIA", "TELEFONE_IMOBILIARIA",
                    "REPRESENTANTE_IMOBILIARIA", "CPF_REPRESENTANTE_IMOB",
                    "NOME_LOCADOR", "CPF_LOCADOR", "RG_LOCADOR",
                    "CEP_LOCADOR", "ENDERECO_LOCADOR", "NUMERO_LOCADOR", "COMPLEMENTO_LOCADOR",
                    "BAIRRO_LOCADOR", "CIDADE_LOCADOR", "ESTADO_LOCADOR",
                    "EMAIL_LOCADOR", "TELEFONE_LOCADOR",
                ],
                PROPERTY_FIELDS,
                &[
                    "DESCRICAO_IMOVEL", "VALOR_ALUGUEL", "PERCENTUAL_ADMINISTRACAO",
                    "PRAZO_CONTRATO", "DATA_INICIO",
                ],
            ]),
            include_str!("../../static/templates/administracao_imobiliaria.txt"),
        ),
        Template::new(
            RURAL_PERSON,
            "Locação Rural - Imobiliária x Pessoa Física",
            &concat_fields(&[
                AGENCY_FIELDS,
                RURAL_LANDLORD_FIELDS,
                &[
                    "NOME_LOCATARIO", "CPF_LOCATARIO", "RG_LOCATARIO",
                    "CEP_LOCATARIO", "ENDERECO_LOCATARIO", "NUMERO_LOCATARIO",
                    "BAIRRO_LOCATARIO", "CIDADE_LOCATARIO", "ESTADO_LOCATARIO",
                    "CEP_IMOVEL", "ENDERECO_IMOVEL", "AREA_IMOVEL", "MATRICULA_IMOVEL",
                    "CIDADE_IMOVEL", "ESTADO_IMOVEL", "FINALIDADE_USO", "VALOR_ALUGUEL",
                    "DIA_VENCIMENTO", "PRAZO_CONTRATO", "DATA_INICIO", "DATA_FIM",
                ],
            ]),
            include_str!("../../static/templates/rural_pf.txt"),
        ),
        Template::new(
            RURAL_COMPANY,
            "Locação Rural - Imobiliária x Pessoa Jurídica",
            &concat_fields(&[
                AGENCY_FIELDS,
                RURAL_LANDLORD_FIELDS,
                &[
                    "RAZAO_SOCIAL_LOCATARIO", "CNPJ_LOCATARIO",
                    "REPRESENTANTE_LEGAL", "CPF_REPRESENTANTE",
                    "CEP_LOCATARIO", "ENDERECO_LOCATARIO", "NUMERO_LOCATARIO",
                    "BAIRRO_LOCATARIO", "CIDADE_LOCATARIO", "ESTADO_LOCATARIO",
                    "CEP_IMOVEL", "ENDERECO_IMOVEL", "AREA_IMOVEL", "MATRICULA_IMOVEL",
                    "CIDADE_IMOVEL", "ESTADO_IMOVEL", "FINALIDADE_USO", "VALOR_ALUGUEL",
                    "DIA_VENCIMENTO", "PRAZO_CONTRATO", "DATA_INICIO", "DATA_FIM",
                ],
            ]),
            include_str!("../../static/templates/rural_pj.txt"),
        ),
    ]
});

pub fn all_templates() -> &'static [Template] {
    TEMPLATES.as_slice()
}

pub fn template_by_id(id: &str) -> Option<&'static Template> {
    TEMPLATES.iter().find(|t| t.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_ids_are_unique() {
        let mut ids: Vec<&str> = all_templates().iter().map(|t| t.id).collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);
        assert_eq!(total, 5);
    }

    #[test]
    fn test_every_placeholder_is_a_field() {
        for template in all_templates() {
            for placeholder in extract_fields(template.body) {
                assert!(
                    template.has_field(&placeholder),
                    "{} is missing {}",
                    template.id,
                    placeholder
                );
            }
        }
    }

    #[test]
    fn test_derived_fields_are_appended_after_curated_ones() {
        let template = template_by_id(RESIDENTIAL_PERSON).unwrap();
        let names = template.field_names();
        assert_eq!(names[0], "NOME_LOCADOR");
        assert!(template.has_field("ESTADO_CIVIL_LOCADOR"));
        let curated_end = names.iter().position(|n| n == "INDICE_REAJUSTE").unwrap();
        let derived = names.iter().position(|n| n == "ESTADO_CIVIL_LOCADOR").unwrap();
        assert!(derived > curated_end);
    }

    #[test]
    fn test_unknown_template() {
        assert!(template_by_id("nao_existe").is_none());
    }
}
